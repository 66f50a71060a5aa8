use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigArgs, MonitorArgs};

#[derive(Parser, Debug)]
#[command(name = "surge-watch")]
#[command(about = "Pump/dump and manipulation monitor for MEXC perpetual contracts", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monitor continuously until Ctrl+C
    Run(MonitorArgs),
    /// Run one tick and print the report as JSON
    Once(MonitorArgs),
    /// List the built-in mode profiles
    Modes,
    /// Validate and print the effective configuration
    CheckConfig(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stderr keeps stdout clean for `once` and `check-config` output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::monitor::run(args).await?,
        Commands::Once(args) => commands::monitor::once(args).await?,
        Commands::Modes => commands::modes::run()?,
        Commands::CheckConfig(args) => commands::check_config::run(&args)?,
    }

    Ok(())
}
