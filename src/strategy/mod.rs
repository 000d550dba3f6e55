//! Strategy Layer - Hedge ratio, spread z-score and position rule
//!
//! - `regression`: OLS hedge ratio of A on B with t-test p-values
//! - `zscore_gate`: rolling mean / sample std over a fixed window
//! - `spread`: regression residual standardized by the rolling gate
//! - `position_rule`: z-score thresholds and stop-loss to pair positions
//! - `correlation`: overall and rolling return correlation of the legs
//! - `params`: the immutable backtest configuration

pub mod correlation;
pub mod params;
pub mod position_rule;
pub mod regression;
pub mod spread;
pub mod zscore_gate;

pub use correlation::{pearson, CorrelationPoint, CorrelationSummary, ReturnCorrelation};
pub use params::{BacktestConfig, ConfigError, PositionPolicy};
pub use position_rule::{PositionRule, PositionRuleError};
pub use regression::{HedgeRatioEstimator, RegressionError, RegressionResult, TrainingRange};
pub use spread::{SpreadPoint, SpreadSignalEngine};
pub use zscore_gate::{ZScoreGate, ZScoreResult};
