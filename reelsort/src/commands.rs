use crate::CLAP_STYLING;
use clap::{arg, command};
use reelsort_core::config::DEFAULT_CONFIG_DIR;
use std::path::PathBuf;
use url::Url;

fn database_arg() -> clap::Arg {
    arg!(-d --"database" <PATH>)
        .required(false)
        .help("Path to the reelsort database (default: ~/.config/reelsort/reelsort.db)")
        .value_parser(clap::value_parser!(PathBuf))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("reelsort")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("reelsort")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Show debug logging").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the reelsort database and configuration on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the reelsort database and config.json")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database and configuration \
                        at the specified location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("classify")
                .about(
                    "Classifies indexed folders into movies, franchises and genres, then \
                aggregates franchise metadata.",
                )
                .arg(database_arg())
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("Path to config.json (default: next to the database)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"augment")
                        .required(false)
                        .help("Generate franchise plot and awards text with a local model")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("no-augment"),
                )
                .arg(
                    arg!(--"no-augment")
                        .required(false)
                        .help("Skip augmentation even if enabled in the configuration")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("augment"),
                )
                .arg(
                    arg!(--"endpoint" <URL>)
                        .required(false)
                        .help("Base URL of an OpenAI-compatible completion server")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"model" <NAME>)
                        .required(false)
                        .help("Model name sent to the completion server"),
                ),
        )
        .subcommand(
            command!("report")
                .about("Reports the stored classifications and franchise aggregates")
                .arg(database_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("tree")
                .about("Shows the indexed folder hierarchy")
                .arg(database_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Tree format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the tree to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}
