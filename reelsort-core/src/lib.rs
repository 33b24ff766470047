pub mod aggregate;
pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod genre;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod report;

use colored::Colorize;

pub use error::{CoreError, Result};

pub fn print_banner() {
    let banner = r#"
              _                _
 _ __ ___  ___| |___  ___  _ __| |_
| '__/ _ \/ _ \ / __|/ _ \| '__| __|
| | |  __/  __/ \__ \ (_) | |  | |_
|_|  \___|\___|_|___/\___/|_|   \__|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "movies, franchises and genres from your folders".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
