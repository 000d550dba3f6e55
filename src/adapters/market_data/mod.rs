//! Market Data Adapters
//!
//! Price history sources that do not need the network:
//! - `JsonFileHistory`: CoinGecko-shaped JSON files on disk
//! - `SyntheticPair`: seeded, co-moving random walks for smoke runs

mod json_file;
mod synthetic;

pub use json_file::JsonFileHistory;
pub use synthetic::{SyntheticPair, SyntheticPairConfig, SYNTHETIC_A, SYNTHETIC_B};
