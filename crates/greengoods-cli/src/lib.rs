//! Green Goods CLI
//!
//! Operator tooling around the attestation engine:
//! - Inspect the environment table the engine would be started with
//! - Run the reference claim flow against an in-process engine and a mock
//!   registry, printing every emitted event

use std::ffi::OsString;

use clap::{Parser, Subcommand, ValueEnum};
use greengoods_engine::EngineConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{environment, simulate};

/// Output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Green Goods CLI application
#[derive(Parser, Debug)]
#[command(name = "greengoods")]
#[command(about = "Green Goods - attestation engine operator CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GREENGOODS_CONFIG")]
    config: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured deployment environments
    Environments,

    /// Show one environment entry
    Environment {
        /// Environment identifier
        id: String,
    },

    /// Run the reference claim flow and print emitted events
    Simulate(simulate::SimulateArgs),

    /// Show the effective configuration
    Config,
}

/// Run using the current process arguments.
pub async fn run() -> anyhow::Result<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let filter = if cli.verbose { "debug" } else { "info" };
    // A second run in the same process keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init();

    let config = EngineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Environments => environment::list(&config, cli.output),
        Commands::Environment { id } => environment::show(&config, &id, cli.output),
        Commands::Simulate(args) => simulate::execute(config, args, cli.output).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
