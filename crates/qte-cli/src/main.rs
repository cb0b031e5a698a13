//! Command-line entry point for the trade-decision engine: loads a
//! configuration file and drives it either through a single dry-run
//! decision or the full control loop against the paper broker.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qte")]
#[command(about = "Automated equity trade-decision engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a configuration file and report whether it is well-formed.
    ValidateConfig {
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },
    /// Evaluate the entry gate pipeline once for a single symbol and print the decision.
    Check {
        #[arg(long, default_value = "config.yaml")]
        config: String,
        #[arg(long)]
        symbol: String,
    },
    /// Run the control loop until a shutdown signal is received.
    Run {
        #[arg(long, default_value = "config.yaml")]
        config: String,
        #[arg(long, default_value = "data/positions_tracked.json")]
        tracker: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.cmd {
        Commands::ValidateConfig { config } => commands::validate_config(&config),
        Commands::Check { config, symbol } => commands::check(&config, &symbol),
        Commands::Run { config, tracker } => commands::run(&config, &tracker).await,
    };

    if let Err(err) = result {
        tracing::error!(%err, "fatal error");
        std::process::exit(1);
    }
    Ok(())
}
