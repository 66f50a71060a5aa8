use crate::config::MonitorConfig;
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the optional override file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Monitor.toml";

/// Prefix for environment overrides, e.g. `SURGE_TICK_INTERVAL_SECS=5` or
/// `SURGE_DETECTORS__VOLUME_EXPLOSION__RATIO_THRESHOLD=6`.
pub const ENV_PREFIX: &str = "SURGE_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode is unknown, the layers cannot be
    /// extracted, or the result fails validation.
    pub fn load(mode: Option<&str>) -> Result<MonitorConfig, ConfigError> {
        Self::layered(mode, Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Loads configuration from an explicit file, which must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or any layer is invalid.
    pub fn load_from_file(mode: Option<&str>, path: &Path) -> Result<MonitorConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Load(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Self::layered(mode, path)
    }

    /// Merges the selected profile, the TOML file, and `SURGE_` env vars.
    ///
    /// The profile is chosen by `mode` when given, otherwise by a `mode` key in
    /// the file or environment, otherwise `balanced`.
    fn layered(mode: Option<&str>, path: &Path) -> Result<MonitorConfig, ConfigError> {
        let overrides = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mode = match mode {
            Some(m) => m.to_string(),
            None => overrides
                .extract_inner::<String>("mode")
                .unwrap_or_else(|_| "balanced".to_string()),
        };
        let base = MonitorConfig::profile(&mode)?;

        let mut config: MonitorConfig = Figment::from(Serialized::defaults(base))
            .merge(overrides)
            .extract()?;
        config.mode = mode;

        config.validate()?;

        tracing::debug!(
            mode = %config.mode,
            path = %path.display(),
            symbols = config.symbols.len(),
            "Loaded monitor configuration"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn missing_default_file_yields_profile() {
        Jail::expect_with(|_jail| {
            let cfg = ConfigLoader::load(Some("fast")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, MonitorConfig::fast());
            Ok(())
        });
    }

    #[test]
    fn file_overrides_profile() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Monitor.toml",
                r#"
                symbols = ["BTC_USDT", "ETH_USDT"]
                cooldown_secs = 90

                [detectors.rsi_divergence]
                oversold = 25.0
                "#,
            )?;
            let cfg = ConfigLoader::load(Some("balanced")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.symbols, vec!["BTC_USDT", "ETH_USDT"]);
            assert_eq!(cfg.cooldown_secs, 90);
            assert!((cfg.detectors.rsi_divergence.oversold - 25.0).abs() < f64::EPSILON);
            assert!((cfg.detectors.rsi_divergence.overbought - 70.0).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Monitor.toml", "cooldown_secs = 90")?;
            jail.set_env("SURGE_COOLDOWN_SECS", "45");
            jail.set_env("SURGE_DETECTORS__VOLUME_EXPLOSION__RATIO_THRESHOLD", "7.5");
            let cfg = ConfigLoader::load_from_file(None, Path::new("Monitor.toml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(cfg.mode, "balanced");
            assert_eq!(cfg.cooldown_secs, 45);
            assert!((cfg.detectors.volume_explosion.ratio_threshold - 7.5).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn mode_can_come_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Monitor.toml", "mode = \"thorough\"")?;
            let cfg = ConfigLoader::load_from_file(None, Path::new("Monitor.toml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(cfg.mode, "thorough");
            assert_eq!(cfg.tick_interval_secs, 15);
            Ok(())
        });
    }

    #[test]
    fn unknown_mode_is_fatal() {
        Jail::expect_with(|_jail| {
            let err = ConfigLoader::load(Some("ludicrous")).unwrap_err();
            assert!(matches!(err, ConfigError::UnknownMode { .. }));
            Ok(())
        });
    }

    #[test]
    fn invalid_weights_in_file_are_fatal() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Monitor.toml",
                "[detectors.volume_explosion]\nweight = 0.9\n",
            )?;
            let err = ConfigLoader::load_from_file(None, Path::new("Monitor.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidWeights { .. }));
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = ConfigLoader::load_from_file(None, Path::new("nope.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
            Ok(())
        });
    }
}
