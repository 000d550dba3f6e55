//! Domain Layer - Core types for the pairs backtest
//!
//! Pure data and arithmetic with no I/O:
//! - `series`: aligned price table and per-leg returns
//! - `position` / `signal`: hedged pair position and the signal behind it
//! - `cost`: commission + slippage on leg turnover
//! - `performance`: costed strategy returns, equity curve and risk metrics
//! - `statistic`: values that may be undefined (zero denominators)

pub mod cost;
pub mod performance;
pub mod position;
pub mod series;
pub mod signal;
pub mod statistic;

pub use cost::{CostError, CostModel, CostPoint};
pub use performance::{
    sharpe_ratio, EquityCurve, PerformanceAnalyzer, PerformanceError, PerformancePoint, PerformanceReport,
};
pub use position::{PairPosition, PositionVector};
pub use series::{AlignedRow, AlignedSeries, PricePoint, ReturnRow, ReturnSeries, SeriesError};
pub use signal::SignalKind;
pub use statistic::Statistic;
