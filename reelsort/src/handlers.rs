use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use reelsort_augment::{Augmentor, ChatClient};
use reelsort_core::config::{CONFIG_FILE, Config, DATABASE_FILE, DEFAULT_CONFIG_DIR};
use reelsort_core::data::Database;
use reelsort_core::graph::PathGraph;
use reelsort_core::pipeline::{
    PipelineOptions, PipelineProgressCallback, RunSummary, execute_pipeline,
};
use reelsort_core::report::{
    ReportFormat, export_tree_json, gather_report_data, render, render_tree_text, save_report,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

// Helper functions shared by the handlers

/// Expands `~` in a configuration directory argument.
pub fn resolve_config_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn resolve_database_path(database: Option<&PathBuf>) -> PathBuf {
    match database {
        Some(path) => resolve_config_dir(&path.to_string_lossy()),
        None => resolve_config_dir(DEFAULT_CONFIG_DIR).join(DATABASE_FILE),
    }
}

/// An explicit path wins; otherwise `config.json` is looked up next to the
/// database.
pub fn resolve_config_path(config: Option<&PathBuf>, database_path: &Path) -> PathBuf {
    match config {
        Some(path) => resolve_config_dir(&path.to_string_lossy()),
        None => database_path
            .parent()
            .map(|dir| dir.join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE)),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if !path.exists() {
        debug!("No configuration at {}, using defaults", path.display());
    }
    Ok(config)
}

/// Applies the classify command-line overrides to a loaded configuration.
pub fn apply_overrides(
    config: &mut Config,
    augment: bool,
    no_augment: bool,
    endpoint: Option<&Url>,
    model: Option<&String>,
) {
    if augment {
        config.augment.enabled = true;
    }
    if no_augment {
        config.augment.enabled = false;
    }
    if let Some(endpoint) = endpoint {
        config.augment.endpoint = endpoint.as_str().to_string();
    }
    if let Some(model) = model {
        config.augment.model = model.clone();
    }
}

pub fn build_augmentor(config: &Config) -> Result<Option<Augmentor<ChatClient>>> {
    if !config.augment.enabled {
        return Ok(None);
    }
    let client = ChatClient::with_timeout(&config.augment.endpoint, config.augment.timeout_secs)
        .with_context(|| {
            format!(
                "Invalid augmentation endpoint {}",
                config.augment.endpoint
            )
        })?
        .with_model(config.augment.model.clone());
    Ok(Some(Augmentor::new(client)))
}

pub fn open_database(path: &Path) -> Result<Database> {
    if !Database::exists(path) {
        bail!(
            "No database at {}. Run `reelsort init` first or pass --database.",
            path.display()
        );
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Creates the configuration directory, writes `config.json` and creates
/// the database. Existing files are replaced only when `overwrite` is set.
pub fn create_configuration_assets(config_dir: &Path, overwrite: bool) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let config_path = config_dir.join(CONFIG_FILE);
    if overwrite || !config_path.exists() {
        Config::default()
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let db_path = config_dir.join(DATABASE_FILE);
    if overwrite && Database::exists(&db_path) {
        Database::drop(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
    }
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    Ok((config_path, db_path))
}

fn exit_with(error: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "✗".red().bold(), error);
    std::process::exit(1);
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  REELSORT INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let raw_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let config_dir = resolve_config_dir(raw_dir);
    let config_path = config_dir.join(CONFIG_FILE);
    let db_path = config_dir.join(DATABASE_FILE);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let config_exists = config_path.exists();
    let db_exists = Database::exists(&db_path);
    let mut overwrite = force;

    if (config_exists || db_exists) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Existing reelsort files found:");
        if config_exists {
            println!(
                "  {} {}",
                "•".yellow(),
                config_path.display().to_string().bright_white()
            );
        }
        if db_exists {
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
        }
        println!();

        let response = print_prompt("Overwrite them? Classification results will be lost. [y/N]:");
        println!();

        if response == "y" || response == "yes" {
            println!("{} Proceeding with overwrite", "→".yellow().bold());
            overwrite = true;
        } else {
            println!("{} Keeping existing files", "→".blue());
        }
        println!();
    }

    println!("{} Creating configuration assets...", "→".blue());
    let (config_path, db_path) = match create_configuration_assets(&config_dir, overwrite) {
        Ok(paths) => paths,
        Err(e) => exit_with(e),
    };

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config: {}",
        "✓".green().bold(),
        config_path.display().to_string().bright_white()
    );
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
}

pub async fn handle_classify(args: &ArgMatches) {
    let db_path = resolve_database_path(args.get_one::<PathBuf>("database"));
    let config_path = resolve_config_path(args.get_one::<PathBuf>("config"), &db_path);

    let mut config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };
    apply_overrides(
        &mut config,
        args.get_flag("augment"),
        args.get_flag("no-augment"),
        args.get_one::<Url>("endpoint"),
        args.get_one::<String>("model"),
    );

    let db = match open_database(&db_path) {
        Ok(db) => db,
        Err(e) => exit_with(e),
    };
    let augmentor = match build_augmentor(&config) {
        Ok(augmentor) => augmentor,
        Err(e) => exit_with(e),
    };

    println!("\n🎬 Classifying {}", db_path.display());
    println!(
        "Excluded folders: {}",
        config
            .excluded_folders
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    let augment_str = if config.augment.enabled {
        format!("{} ({})", config.augment.endpoint, config.augment.model)
    } else {
        "disabled".to_string()
    };
    println!("Augmentation: {}\n", augment_str);
    info!("Using configuration {}", config_path.display());

    let options = PipelineOptions {
        config,
        show_progress_bars: true,
    };
    let progress_callback: PipelineProgressCallback = Arc::new(|msg: String| {
        println!("{}", msg);
    });

    match execute_pipeline(&db, options, augmentor.as_ref(), Some(progress_callback)).await {
        Ok(summary) => print_run_summary(&summary),
        Err(e) => exit_with(anyhow::Error::new(e).context("Classification run failed")),
    }
}

fn print_run_summary(summary: &RunSummary) {
    println!("\n{} Classification complete!\n", "✓".green().bold());
    println!("  Run:         {}", summary.run_id.dimmed());
    println!("  Folders:     {}", summary.nodes);
    println!("  Movies:      {}", summary.movies.to_string().cyan());
    println!("  Franchises:  {}", summary.franchises.to_string().cyan());
    println!("  Genres:      {}", summary.genres.to_string().cyan());
    println!("  New genres:  {}", summary.new_genres);
    if summary.augmented > 0 {
        println!("  Augmented:   {}", summary.augmented);
    }
    if summary.missing_metadata > 0 {
        println!(
            "  {} {} movies have no metadata",
            "⚠".yellow(),
            summary.missing_metadata
        );
    }
    if summary.exclusions > 0 {
        println!(
            "  {} {} values could not be parsed and were left out",
            "⚠".yellow(),
            summary.exclusions
        );
    }
    println!();
}

pub fn handle_report(args: &ArgMatches) {
    let db_path = resolve_database_path(args.get_one::<PathBuf>("database"));
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");

    let result = open_database(&db_path).and_then(|db| {
        let data = gather_report_data(&db).context("Failed to read results")?;
        render(&data, format).context("Failed to render report")
    });
    let content = match result {
        Ok(content) => content,
        Err(e) => exit_with(e),
    };

    write_output(&content, output);
}

pub fn handle_tree(args: &ArgMatches) {
    let db_path = resolve_database_path(args.get_one::<PathBuf>("database"));
    let as_json = args.get_one::<String>("format").map(String::as_str) == Some("json");
    let output = args.get_one::<PathBuf>("output");

    let result = open_database(&db_path).and_then(|db| {
        if as_json {
            return export_tree_json(&db).context("Failed to export tree");
        }
        let edges = db.load_edges().context("Failed to read folder steps")?;
        let classifications = db
            .get_classifications()
            .context("Failed to read classifications")?;
        Ok(render_tree_text(
            &PathGraph::build(edges).to_tree(),
            &classifications,
        ))
    });
    let content = match result {
        Ok(content) => content,
        Err(e) => exit_with(e),
    };

    write_output(&content, output);
}

fn write_output(content: &str, output: Option<&PathBuf>) {
    match output {
        Some(path) => match save_report(content, path) {
            Ok(()) => println!(
                "{} Saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            ),
            Err(e) => exit_with(anyhow::Error::new(e).context(format!(
                "Failed to write {}",
                path.display()
            ))),
        },
        None => print!("{}", content),
    }
}
