//! CoinGecko Adapter
//!
//! Daily price history from the public CoinGecko API.

mod chart;
mod client;

pub use chart::MarketChart;
pub use client::{CoinGeckoClient, CoinGeckoConfig};
