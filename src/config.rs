//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key is optional. A missing file means all defaults.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{HotasError, Result};
use crate::monitor::lifecycle::SessionSettings;
use crate::monitor::sampler::{SamplingSettings, DEFAULT_POLL_RATE_HZ, DEFAULT_WARMUP_MS};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub hotplug: HotplugConfig,
}

/// Mini-stick sampling configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SamplingConfig {
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// Readings taken this long after attach only feed the display
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
}

/// Console display configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    #[serde(default = "default_display_interval_ms")]
    pub interval_ms: u64,
}

/// Device discovery configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HotplugConfig {
    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,
}

// Default value functions
fn default_poll_rate_hz() -> u32 { DEFAULT_POLL_RATE_HZ }
fn default_warmup_ms() -> u64 { DEFAULT_WARMUP_MS }
fn default_display_interval_ms() -> u64 { 100 }
fn default_rescan_interval_ms() -> u64 { 1000 }

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: default_poll_rate_hz(),
            warmup_ms: default_warmup_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_display_interval_ms(),
        }
    }
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            rescan_interval_ms: default_rescan_interval_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hotas_ministick::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse and validate TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.sampling.poll_rate_hz == 0 || self.sampling.poll_rate_hz > 1000 {
            return Err(invalid("poll_rate_hz must be between 1 and 1000"));
        }

        if self.sampling.warmup_ms > 60000 {
            return Err(invalid("warmup_ms must be between 0 and 60000"));
        }

        if self.display.interval_ms == 0 || self.display.interval_ms > 10000 {
            return Err(invalid("display interval_ms must be between 1 and 10000"));
        }

        if self.hotplug.rescan_interval_ms == 0 || self.hotplug.rescan_interval_ms > 60000 {
            return Err(invalid("rescan_interval_ms must be between 1 and 60000"));
        }

        Ok(())
    }

    /// Sampling period and warm-up for new sessions
    pub fn sampling_settings(&self) -> SamplingSettings {
        SamplingSettings::from_rate(
            self.sampling.poll_rate_hz,
            Duration::from_millis(self.sampling.warmup_ms),
        )
    }

    /// Everything a monitoring session needs from the config
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            sampling: self.sampling_settings(),
            display_interval: Duration::from_millis(self.display.interval_ms),
        }
    }

    /// Period between `/dev/input` scans
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.hotplug.rescan_interval_ms)
    }
}

fn invalid(msg: &str) -> HotasError {
    HotasError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sampling.poll_rate_hz, 60);
        assert_eq!(config.sampling.warmup_ms, 3000);
        assert_eq!(config.display.interval_ms, 100);
        assert_eq!(config.hotplug.rescan_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_section() {
        let config = Config::parse("[sampling]\nwarmup_ms = 5000\n").unwrap();
        assert_eq!(config.sampling.warmup_ms, 5000);
        assert_eq!(config.sampling.poll_rate_hz, 60);
    }

    #[test]
    fn test_poll_rate_zero() {
        let mut config = Config::default();
        config.sampling.poll_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_rate_too_high() {
        let mut config = Config::default();
        config.sampling.poll_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warmup_bounds() {
        let mut config = Config::default();
        config.sampling.warmup_ms = 0;
        assert!(config.validate().is_ok());
        config.sampling.warmup_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_interval_zero() {
        let mut config = Config::default();
        config.display.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rescan_interval_too_high() {
        let mut config = Config::default();
        config.hotplug.rescan_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let err = Config::parse("[display]\ninterval_ms = 0\n").unwrap_err();
        assert!(matches!(err, HotasError::Config(_)));
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(Config::parse("[sampling]\npoll_rate_hz = \"fast\"\n").is_err());
    }

    #[test]
    fn test_session_settings() {
        let config = Config::parse("[sampling]\npoll_rate_hz = 100\nwarmup_ms = 0\n").unwrap();
        let settings = config.session_settings();
        assert_eq!(settings.sampling.period, Duration::from_millis(10));
        assert_eq!(settings.sampling.warmup, Duration::ZERO);
        assert_eq!(settings.display_interval, Duration::from_millis(100));
        assert_eq!(config.rescan_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[sampling]
poll_rate_hz = 30

[display]

[hotplug]
rescan_interval_ms = 500
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.sampling.poll_rate_hz, 30);
        assert_eq!(config.rescan_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&path), Err(HotasError::Io(_))));
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_shipped_default_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }
}
