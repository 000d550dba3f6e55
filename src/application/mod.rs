//! Application Layer - Backtest use case
//!
//! Wires the strategy stages into one run and exposes the result as a
//! read-only snapshot for reporting.

pub mod backtest;

pub use backtest::{BacktestEngine, BacktestError, BacktestRun, RunError, Stage};
