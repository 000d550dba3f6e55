//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, the engine only sees price history
//! through `PriceHistoryPort`; CoinGecko and on-disk JSON are adapters.

pub mod market_data;
pub mod mocks;

pub use market_data::{fetch_pair, HistoryRange, PriceHistoryError, PriceHistoryPort};
pub use mocks::MockPriceHistory;
