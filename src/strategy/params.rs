//! Backtest Parameters
//!
//! Immutable configuration handed to the engine. Every threshold and
//! window is an explicit field so parameter sweeps are just different
//! values of this struct.

use serde::{Deserialize, Serialize};

use crate::domain::cost::CostModel;
use crate::domain::performance::DEFAULT_ANNUALIZATION;
use crate::strategy::regression::TrainingRange;

/// How a bar without an open/close condition is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionPolicy {
    /// Each bar is decided from its own z-score; no condition means flat
    #[default]
    Recompute,
    /// An open position persists until an explicit close, an opposite
    /// entry, a stop-loss or an undefined z-score
    Hold,
}

/// Main backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Trailing observations for the spread's rolling mean/std
    pub rolling_window: usize,
    /// |z| above this opens a position
    pub z_open: f64,
    /// |z| below this closes a position
    pub z_close: f64,
    /// Flatten when |spread / priceA| exceeds this fraction
    pub stop_loss_fraction: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    /// Periods per year used to annualize the Sharpe ratio
    pub annualization_factor: u32,
    pub position_policy: PositionPolicy,
    /// Window for the rolling return correlation
    pub correlation_window: usize,
    /// Rows used to fit the hedge ratio; `None` fits on the whole series
    pub training: Option<TrainingRange>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            rolling_window: 30,
            z_open: 1.0,
            z_close: 0.5,
            stop_loss_fraction: 0.15,
            commission_rate: 0.001,
            slippage_rate: 0.0005,
            annualization_factor: DEFAULT_ANNUALIZATION,
            position_policy: PositionPolicy::Recompute,
            correlation_window: 30,
            training: None,
        }
    }
}

impl BacktestConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn with_thresholds(mut self, z_open: f64, z_close: f64) -> Self {
        self.z_open = z_open;
        self.z_close = z_close;
        self
    }

    pub fn with_stop_loss(mut self, fraction: f64) -> Self {
        self.stop_loss_fraction = fraction;
        self
    }

    pub fn with_costs(mut self, commission_rate: f64, slippage_rate: f64) -> Self {
        self.commission_rate = commission_rate;
        self.slippage_rate = slippage_rate;
        self
    }

    pub fn with_policy(mut self, policy: PositionPolicy) -> Self {
        self.position_policy = policy;
        self
    }

    pub fn with_training(mut self, training: TrainingRange) -> Self {
        self.training = Some(training);
        self
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.commission_rate, self.slippage_rate)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window < 2 {
            return Err(ConfigError::InvalidWindow(self.rolling_window));
        }
        if self.correlation_window < 2 {
            return Err(ConfigError::InvalidCorrelationWindow(self.correlation_window));
        }
        if !self.z_close.is_finite() || !self.z_open.is_finite() || self.z_close <= 0.0 || self.z_close >= self.z_open {
            return Err(ConfigError::InvalidThresholds {
                z_open: self.z_open,
                z_close: self.z_close,
            });
        }
        if !self.stop_loss_fraction.is_finite() || self.stop_loss_fraction <= 0.0 {
            return Err(ConfigError::InvalidStopLoss(self.stop_loss_fraction));
        }
        for rate in [self.commission_rate, self.slippage_rate] {
            if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
                return Err(ConfigError::InvalidCostRate(rate));
            }
        }
        if self.annualization_factor == 0 {
            return Err(ConfigError::InvalidAnnualization);
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid rolling window: {0} (minimum 2)")]
    InvalidWindow(usize),
    #[error("Invalid correlation window: {0} (minimum 2)")]
    InvalidCorrelationWindow(usize),
    #[error("Invalid thresholds: z_open={z_open}, z_close={z_close} (must be 0 < z_close < z_open)")]
    InvalidThresholds { z_open: f64, z_close: f64 },
    #[error("Invalid stop loss fraction: {0} (must be > 0)")]
    InvalidStopLoss(f64),
    #[error("Invalid cost rate: {0} (must be 0 <= rate < 1)")]
    InvalidCostRate(f64),
    #[error("Invalid annualization factor: must be > 0")]
    InvalidAnnualization,
}
