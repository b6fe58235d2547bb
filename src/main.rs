use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use xrate::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for xrate::AppCommand {
    fn from(cmd: Commands) -> xrate::AppCommand {
        match cmd {
            Commands::Rate { from, to } => xrate::AppCommand::Rate { from, to },
            Commands::Convert { amount, from, to } => {
                xrate::AppCommand::Convert { amount, from, to }
            }
            Commands::Batch {
                input,
                from,
                to,
                fields,
                output,
            } => xrate::AppCommand::Batch {
                input,
                from,
                to,
                fields,
                output,
            },
            Commands::Rates { base, refresh } => xrate::AppCommand::Rates { base, refresh },
            Commands::Currencies => xrate::AppCommand::Currencies,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the exchange rate between two currencies
    Rate { from: String, to: String },
    /// Convert an amount between currencies
    Convert {
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        from: String,
        to: String,
    },
    /// Convert the prices in a JSON or YAML file of records
    Batch {
        /// Input file holding an array of records
        input: PathBuf,
        from: String,
        to: String,
        /// Monetary field to convert (repeatable)
        #[arg(short, long = "field", default_value = "price")]
        fields: Vec<String>,
        /// Write converted records here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the cached rate table
    Rates {
        /// Base currency to show rates for
        #[arg(short, long)]
        base: Option<String>,
        /// Fetch fresh rates even if the cache is current
        #[arg(short, long)]
        refresh: bool,
    },
    /// List supported currencies
    Currencies,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xrate::cli::setup::setup(),
        Some(cmd) => xrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
