//! Plinth CLI Binary
//!
//! Operator tooling for the build engine: the offline template check
//! (authoring regression gate), template listing, and the expired-plan
//! sweep. The live request path is embedded by the hosting server, not
//! exposed here.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use owo_colors::OwoColorize;
use plinth::config::PlinthConfig;
use plinth::logging::{init_logging, LoggingConfig};
use plinth::simulate::check_library;
use plinth::store::{PlanStore, SledPlanStore};
use plinth::template::TemplateLibrary;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "plinth", version, about = "Build-placement engine tooling")]
struct Cli {
    /// Configuration file (defaults to ./plinth.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable logging output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate every template into an empty world and report failures
    Check {
        /// Template directory (defaults to the configured directory, or
        /// the compiled-in set)
        #[arg(long)]
        templates: Option<PathBuf>,
    },
    /// List the loaded template library
    Templates {
        #[arg(long)]
        templates: Option<PathBuf>,
    },
    /// Purge build plans older than the configured TTL
    Sweep,
}

fn main() {
    let cli = Cli::parse();

    let config = match PlinthConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(2);
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(2);
    }

    let result = match &cli.command {
        Command::Check { templates } => run_check(&config, templates.as_deref()),
        Command::Templates { templates } => run_templates(&config, templates.as_deref()),
        Command::Sweep => run_sweep(&config),
    };

    if let Err(e) = result {
        error!("command failed: {e:#}");
        eprintln!("{} {e:#}", "error:".red().bold());
        process::exit(1);
    }
}

fn build_logging_config(cli: &Cli, config: &PlinthConfig) -> LoggingConfig {
    if !cli.verbose {
        let mut logging = LoggingConfig::default();
        logging.level = "off".to_string();
        return logging;
    }
    let mut logging = config.logging.clone();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    logging
}

fn load_library(config: &PlinthConfig, override_dir: Option<&std::path::Path>) -> Result<TemplateLibrary> {
    let dir = override_dir.or(config.storage.templates_dir.as_deref());
    match dir {
        Some(dir) => TemplateLibrary::from_dir(dir)
            .with_context(|| format!("loading templates from {}", dir.display())),
        None => Ok(TemplateLibrary::builtin()),
    }
}

fn run_check(config: &PlinthConfig, templates: Option<&std::path::Path>) -> Result<()> {
    let library = load_library(config, templates)?;
    if library.is_empty() {
        bail!("no templates to check");
    }

    let reports = check_library(&library, &config.world.tolerances());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["template", "version", "pieces", "placed", "result"]);

    let mut failing = 0;
    for report in &reports {
        let result = if report.all_placed() {
            "pass".green().to_string()
        } else {
            failing += 1;
            format!(
                "{} ({})",
                "FAIL".red().bold(),
                report
                    .failures
                    .iter()
                    .map(|f| format!("#{} {} {}", f.index, f.shape, f.reason))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        table.add_row(vec![
            Cell::new(&report.template),
            Cell::new(report.version),
            Cell::new(report.total),
            Cell::new(report.placed),
            Cell::new(result),
        ]);
    }
    println!("{table}");

    if failing > 0 {
        bail!("{failing} of {} templates failed the placement check", reports.len());
    }
    info!(templates = reports.len(), "all templates passed");
    Ok(())
}

fn run_templates(config: &PlinthConfig, templates: Option<&std::path::Path>) -> Result<()> {
    let library = load_library(config, templates)?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["name", "version", "phases", "pieces"]);
    for template in library.iter() {
        table.add_row(vec![
            Cell::new(&template.name),
            Cell::new(template.version),
            Cell::new(
                template
                    .phases
                    .iter()
                    .map(|p| p.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Cell::new(template.piece_count()),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn run_sweep(config: &PlinthConfig) -> Result<()> {
    let store = SledPlanStore::new(&config.storage.db_path)
        .with_context(|| format!("opening plan store at {}", config.storage.db_path.display()))?;
    let purged = store.purge_expired(config.world.plan_ttl_ms())?;
    println!("purged {purged} expired plan(s)");
    info!(purged, "sweep complete");
    Ok(())
}
