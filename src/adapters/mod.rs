//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - CoinGecko: daily price history over HTTP
//! - Market Data: JSON files on disk and a seeded synthetic pair
//! - Report: console summary and JSON export
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod coingecko;
pub mod market_data;
pub mod report;

pub use cli::CliApp;
pub use coingecko::{CoinGeckoClient, CoinGeckoConfig};
pub use market_data::{JsonFileHistory, SyntheticPair, SyntheticPairConfig};
