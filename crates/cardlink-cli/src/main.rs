//! cardlink - command-line terminal for remote card services
//!
//! Runs a remote service against a local card reader, with the server
//! driving card selection and APDU exchange over HTTP.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "cardlink")]
#[command(author, version, about = "Remote card service terminal")]
#[command(propagate_version = true)]
struct Cli {
    /// Server URL, overrides the configuration file
    #[arg(short, long, env = "CARDLINK_SERVER")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "CARDLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a remote service with the card on the configured reader
    Run {
        /// Service identifier known to the server
        service_id: String,

        /// Service input as a JSON document
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the service input from a JSON file
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Selection scenario file, overrides the configuration file
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Do not wait for a card before starting
        #[arg(long)]
        no_wait: bool,
    },

    /// List PC/SC readers
    Readers,

    /// Validate a card selection scenario file
    CheckScenario {
        /// Scenario JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);

    match cli.command {
        Commands::Run {
            service_id,
            input,
            input_file,
            scenario,
            no_wait,
        } => {
            let mut config = match &cli.config {
                Some(path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            if scenario.is_some() {
                config.selection_scenario = scenario;
            }
            let http = config.http_config(cli.server.as_deref())?;
            let input = commands::run::read_input(input, input_file.as_deref())?;

            let ok = commands::run(
                &config,
                &http,
                &service_id,
                input.as_deref(),
                !no_wait,
                &ctx,
            )
            .await?;
            if !ok {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Readers => {
            commands::readers(&ctx)?;
        }

        Commands::CheckScenario { file } => {
            commands::check_scenario(&file, &ctx)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
