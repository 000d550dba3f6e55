//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml structure.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::ports::market_data::HistoryRange;
use crate::strategy::params::{BacktestConfig, PositionPolicy};
use crate::strategy::regression::TrainingRange;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pair: PairSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub signal: SignalSection,
    #[serde(default)]
    pub costs: CostsSection,
    #[serde(default)]
    pub performance: PerformanceSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// The two assets being traded
#[derive(Debug, Clone, Deserialize)]
pub struct PairSection {
    /// Leg A, the regression's dependent asset (e.g. "optimism")
    pub asset_a: String,
    /// Leg B, the hedge asset (e.g. "arbitrum")
    pub asset_b: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    /// Display label, defaults to "A/B"
    #[serde(default)]
    pub label: Option<String>,
}

impl PairSection {
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.asset_a, self.asset_b))
    }
}

/// Where price history comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Coingecko,
    Json,
    Synthetic,
}

/// Price history source and window
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    #[serde(default)]
    pub source: DataSource,
    /// Trailing window in days
    #[serde(default)]
    pub days: Option<u32>,
    /// Relative window: from `start_days_ago` up to `end_days_ago`
    #[serde(default)]
    pub start_days_ago: Option<u32>,
    #[serde(default)]
    pub end_days_ago: Option<u32>,
    /// Absolute window (RFC 3339 strings)
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    /// Directory holding `<asset>.json` files for the json source
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Optional CoinGecko API key
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            days: None,
            start_days_ago: None,
            end_days_ago: None,
            from: None,
            to: None,
            data_dir: default_data_dir(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DataSection {
    /// Resolve the configured window; defaults to the trailing 200 days
    pub fn history_range(&self, now: DateTime<Utc>) -> HistoryRange {
        match (self.from, self.to, self.start_days_ago, self.days) {
            (Some(from), Some(to), _, _) => HistoryRange::Between { from, to },
            (_, _, Some(start), _) => HistoryRange::days_ago(start, self.end_days_ago.unwrap_or(0), now),
            (_, _, _, Some(days)) => HistoryRange::LastDays(days),
            _ => HistoryRange::LastDays(DEFAULT_DAYS),
        }
    }

    /// Get API key with environment variable fallback
    /// Checks COINGECKO_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("COINGECKO_API_KEY").ok().filter(|k| !k.is_empty())
    }

    /// Data directory with `~` expanded
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).to_string())
    }
}

/// Spread signal and position rule parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SignalSection {
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    #[serde(default = "default_z_open")]
    pub z_open: f64,
    #[serde(default = "default_z_close")]
    pub z_close: f64,
    #[serde(default = "default_stop_loss")]
    pub stop_loss_fraction: f64,
    #[serde(default)]
    pub position_policy: PositionPolicy,
    /// Rows or dates the hedge ratio is fitted on; whole series if absent
    #[serde(default)]
    pub training: Option<TrainingRange>,
}

impl Default for SignalSection {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            z_open: default_z_open(),
            z_close: default_z_close(),
            stop_loss_fraction: default_stop_loss(),
            position_policy: PositionPolicy::default(),
            training: None,
        }
    }
}

/// Transaction cost rates, as fractions of traded notional
#[derive(Debug, Clone, Deserialize)]
pub struct CostsSection {
    #[serde(default = "default_commission")]
    pub commission_rate: f64,
    #[serde(default = "default_slippage")]
    pub slippage_rate: f64,
}

impl Default for CostsSection {
    fn default() -> Self {
        Self {
            commission_rate: default_commission(),
            slippage_rate: default_slippage(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceSection {
    /// Periods per year (252 trading days; 365 for round-the-clock markets)
    #[serde(default = "default_annualization")]
    pub annualization_factor: u32,
    #[serde(default = "default_correlation_window")]
    pub correlation_window: usize,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            annualization_factor: default_annualization(),
            correlation_window: default_correlation_window(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const DEFAULT_DAYS: u32 = 200;

fn default_vs_currency() -> String {
    "usd".to_string()
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_rolling_window() -> usize {
    30
}
fn default_z_open() -> f64 {
    1.0
}
fn default_z_close() -> f64 {
    0.5
}
fn default_stop_loss() -> f64 {
    0.15
}
fn default_commission() -> f64 {
    0.001
}
fn default_slippage() -> f64 {
    0.0005
}
fn default_annualization() -> u32 {
    252
}
fn default_correlation_window() -> usize {
    30
}
fn default_log_level() -> String {
    "warn".to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.asset_a.is_empty() || self.pair.asset_b.is_empty() {
            return Err(ConfigError::ValidationError(
                "asset_a and asset_b cannot be empty".to_string(),
            ));
        }

        if self.pair.asset_a == self.pair.asset_b {
            return Err(ConfigError::ValidationError(format!(
                "asset_a and asset_b must differ, got '{}' twice",
                self.pair.asset_a
            )));
        }

        if self.data.days == Some(0) {
            return Err(ConfigError::ValidationError("days must be > 0".to_string()));
        }

        if self.data.from.is_some() != self.data.to.is_some() {
            return Err(ConfigError::ValidationError(
                "from and to must be given together".to_string(),
            ));
        }

        if let (Some(from), Some(to)) = (self.data.from, self.data.to) {
            if from >= to {
                return Err(ConfigError::ValidationError(format!(
                    "from ({}) must be before to ({})",
                    from, to
                )));
            }
        }

        if let Some(start) = self.data.start_days_ago {
            if start <= self.data.end_days_ago.unwrap_or(0) {
                return Err(ConfigError::ValidationError(format!(
                    "start_days_ago ({}) must be greater than end_days_ago ({})",
                    start,
                    self.data.end_days_ago.unwrap_or(0)
                )));
            }
        }

        BacktestConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }
}

// Conversion from Config to BacktestConfig
impl From<&Config> for BacktestConfig {
    fn from(config: &Config) -> Self {
        BacktestConfig {
            rolling_window: config.signal.rolling_window,
            z_open: config.signal.z_open,
            z_close: config.signal.z_close,
            stop_loss_fraction: config.signal.stop_loss_fraction,
            commission_rate: config.costs.commission_rate,
            slippage_rate: config.costs.slippage_rate,
            annualization_factor: config.performance.annualization_factor,
            position_policy: config.signal.position_policy,
            correlation_window: config.performance.correlation_window,
            training: config.signal.training.clone(),
        }
    }
}
