//! Command-line front end of the portfolio planner.
//!
//! # Responsibility
//! - Open a portfolio store and run report, breakdown and listing requests.
//! - Print every response as pretty JSON on stdout.

use clap::{Parser, Subcommand};
use log::error;
use portplan_core::{
    default_log_level, init_logging, open_db, portfolio_resolver, ReportConfig, ReportService,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "portplan")]
#[command(about = "Project portfolio reports and breakdowns", long_about = None)]
struct Cli {
    /// Path of the portfolio SQLite store.
    #[arg(long)]
    db: PathBuf,
    /// Absolute directory for rolling log files. Logging is off without it.
    #[arg(long)]
    log_dir: Option<String>,
    #[arg(long, default_value_t = default_log_level().to_string())]
    log_level: String,
    /// JSON report configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Filter projects and project report columns
    Report {
        /// Encoded filter, e.g. `maturity=1&maturity=3`
        #[arg(long, default_value = "")]
        query: String,
        /// Report column keys; defaults come from the configuration
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Group projects by the values of one attribute
    Breakdown { key: String },
    /// List the attributes offered for breakdowns
    Choices,
    /// List brief descriptions of every project
    Briefs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli module=cli status=error error={err}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir)?;
    }

    let config = match cli.config.as_ref() {
        Some(path) => ReportConfig::from_path(path)?,
        None => ReportConfig::default(),
    };
    let resolver = portfolio_resolver(&config)?;
    let conn = open_db(&cli.db)?;
    resolver.catalog().verify_store(&conn)?;

    let service = ReportService::new(&conn, &resolver, &config);
    match cli.command {
        Commands::Report { query, columns } => print_json(&service.report(&query, &columns)?),
        Commands::Breakdown { key } => print_json(&service.breakdown(&key)?),
        Commands::Choices => print_json(&service.breakdown_choices()),
        Commands::Briefs => print_json(&service.brief_descriptions()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
