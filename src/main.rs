//! Pairs Backtest
//!
//! Statistical-arbitrage backtest of a two-asset pair from the command line.

use anyhow::Result;
use clap::Parser;

use pairs_backtest::adapters::cli::{self, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (COINGECKO_API_KEY goes here, not in the config)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    cli::execute(app).await
}
