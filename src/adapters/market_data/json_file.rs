//! Offline price history from CoinGecko-shaped JSON files.
//!
//! Each asset lives in `<dir>/<asset>.json` holding a market chart payload.
//! A missing file means no history.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::adapters::coingecko::MarketChart;
use crate::domain::series::PricePoint;
use crate::ports::market_data::{HistoryRange, PriceHistoryError, PriceHistoryPort};

/// Timestamps are truncated to the day, matching the CoinGecko adapter
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    dir: PathBuf,
}

impl JsonFileHistory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, asset: &str) -> PathBuf {
        self.dir.join(format!("{}.json", asset))
    }

    /// Write `points` where `fetch_history` will find them
    pub async fn save(&self, asset: &str, points: &[PricePoint]) -> Result<PathBuf, PriceHistoryError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(asset);
        let body = serde_json::to_string_pretty(&MarketChart::from_points(points))?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[async_trait]
impl PriceHistoryPort for JsonFileHistory {
    async fn fetch_history(
        &self,
        asset: &str,
        _vs_currency: &str,
        range: HistoryRange,
    ) -> Result<Vec<PricePoint>, PriceHistoryError> {
        let path = self.path_for(asset);
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("No price file for '{}' at {}", asset, path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let points = range.select(&MarketChart::from_json(&body)?.into_points(true)?);

        tracing::debug!("Loaded {} points for {} from {}", points.len(), asset, path.display());
        Ok(points)
    }

    fn source_name(&self) -> &str {
        "json-file"
    }
}
