use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use surge_watch_core::{ConfigLoader, MonitorConfig};
use surge_watch_mexc::MEXC_CONTRACT_URL;

/// Where the effective configuration comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Mode profile (balanced, fast, thorough, startup).
    #[arg(short, long, env = "SURGE_MODE")]
    pub mode: Option<String>,

    /// TOML override file; defaults to config/Monitor.toml when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated contract symbols, e.g. BTC_USDT,ETH_USDT.
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Vec<String>,
}

impl ConfigArgs {
    /// Layers profile, file and environment, then applies `--symbols`.
    ///
    /// # Errors
    /// Returns error if the mode is unknown or the result fails validation.
    pub fn load(&self) -> Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from_file(self.mode.as_deref(), path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ConfigLoader::load(self.mode.as_deref())?,
        };

        let symbols = normalize_symbols(&self.symbols);
        if !symbols.is_empty() {
            config = config.with_symbols(symbols);
            config.validate()?;
        }
        Ok(config)
    }
}

/// Arguments shared by `run` and `once`.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Directory for features.jsonl, alerts.jsonl and alerts.csv.
    #[arg(short, long, env = "SURGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// MEXC contract API base URL.
    #[arg(long, env = "SURGE_BASE_URL", default_value = MEXC_CONTRACT_URL)]
    pub base_url: String,
}

/// Trims, uppercases and drops empty entries.
fn normalize_symbols(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
