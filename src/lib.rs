//! Pairs Backtest Library
//!
//! Statistical-arbitrage backtest of a two-asset pair: OLS hedge ratio,
//! rolling z-score of the spread, threshold entries/exits with a
//! stop-loss, commission and slippage, and the usual risk metrics.
//!
//! # Modules
//!
//! - `domain`: Core types (AlignedSeries, PairPosition, CostModel, PerformanceAnalyzer)
//! - `ports`: Trait abstractions (PriceHistoryPort)
//! - `strategy`: Signal generation (HedgeRatioEstimator, SpreadSignalEngine, PositionRule)
//! - `adapters`: External implementations (CoinGecko, JSON files, reports, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: BacktestEngine use case

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
