//! Planboard command-line interface
//!
//! Compiles the forecast schema and built-in calculator modules into
//! per-period totals and summary metrics, and manages saved scenarios.

use anyhow::Result;
use clap::{Parser, Subcommand};
use planboard_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

mod cli;

use cli::compile::CompileArgs;
use cli::config::{ConfigArgs, PlanboardConfig};
use cli::scenario::ScenarioAction;
use cli::schema::SchemaAction;
use cli::totals::TotalsArgs;

#[derive(Parser, Debug)]
#[command(name = "planboard", version, about = "Scenario planning dashboard compiler")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Config file (default: ~/.planboard/planboard.toml)
    #[arg(long, global = true, env = "PLANBOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile the schema and modules into per-period totals
    Compile(CompileArgs),

    /// Show raw min/max bounds of the schema
    Totals(TotalsArgs),

    /// Export, validate or merge schema documents
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },

    /// Save, list or show scenarios
    Scenario {
        #[command(subcommand)]
        action: ScenarioAction,
    },

    /// Show configuration and paths
    Config(ConfigArgs),
}

fn run_command(cli: Cli) -> Result<()> {
    let config = PlanboardConfig::load(cli.config.as_deref())?;
    debug!(periods = ?config.engine.periods, presets = ?config.schema.presets, "Loaded configuration");

    match cli.command {
        Commands::Compile(args) => cli::compile::run(args, &config),
        Commands::Totals(args) => cli::totals::run(args, &config),
        Commands::Schema { action } => cli::schema::run(action, &config),
        Commands::Scenario { action } => cli::scenario::run(action, &config),
        Commands::Config(args) => cli::config::run(args, &config, cli.config.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "planboard",
        verbose: cli.verbose,
        quiet: cli.quiet,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}
