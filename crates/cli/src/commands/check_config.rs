use super::args::ConfigArgs;
use anyhow::Result;
use tracing::info;

/// Validates the layered configuration and prints it as JSON.
///
/// An empty symbol list is reported but not rejected; `run` and `once`
/// refuse to start without symbols.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    if config.symbols.is_empty() {
        info!("Configuration is valid but lists no symbols");
    } else {
        info!(mode = %config.mode, symbols = config.symbols.len(), "Configuration is valid");
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
