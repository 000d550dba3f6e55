use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::series::PricePoint;

/// Price history error type
#[derive(Error, Debug)]
pub enum PriceHistoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),
}

/// Which slice of history to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryRange {
    /// Trailing number of days ending now
    LastDays(u32),
    /// Explicit, inclusive window
    Between { from: DateTime<Utc>, to: DateTime<Utc> },
}

impl HistoryRange {
    /// Window between `start_days_ago` and `end_days_ago` before `now`
    pub fn days_ago(start_days_ago: u32, end_days_ago: u32, now: DateTime<Utc>) -> Self {
        HistoryRange::Between {
            from: now - chrono::Duration::days(i64::from(start_days_ago)),
            to: now - chrono::Duration::days(i64::from(end_days_ago)),
        }
    }

    pub fn validate(&self) -> Result<(), PriceHistoryError> {
        match *self {
            HistoryRange::LastDays(0) => Err(PriceHistoryError::InvalidRange(
                "days must be > 0".to_string(),
            )),
            HistoryRange::Between { from, to } if from >= to => Err(PriceHistoryError::InvalidRange(
                format!("from ({}) must be before to ({})", from, to),
            )),
            _ => Ok(()),
        }
    }

    /// Whether `timestamp` falls inside an explicit window.
    /// Trailing ranges are resolved by the supplier and always match.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        match *self {
            HistoryRange::LastDays(_) => true,
            HistoryRange::Between { from, to } => timestamp >= from && timestamp <= to,
        }
    }

    /// Restrict an ascending, fully local history to this range.
    /// Trailing ranges keep the last `days + 1` points (both endpoints).
    pub fn select(&self, points: &[PricePoint]) -> Vec<PricePoint> {
        match *self {
            HistoryRange::LastDays(days) => {
                let keep = (days as usize).saturating_add(1);
                points[points.len().saturating_sub(keep)..].to_vec()
            }
            HistoryRange::Between { .. } => points
                .iter()
                .copied()
                .filter(|p| self.contains(p.timestamp))
                .collect(),
        }
    }
}

/// Source of daily price history for one asset.
///
/// Implementations return points in ascending timestamp order. A range
/// with no data is an empty vector, not an error.
#[async_trait]
pub trait PriceHistoryPort: Send + Sync {
    async fn fetch_history(
        &self,
        asset: &str,
        vs_currency: &str,
        range: HistoryRange,
    ) -> Result<Vec<PricePoint>, PriceHistoryError>;

    /// Name used in log lines
    fn source_name(&self) -> &str;
}

/// Fetch both legs of a pair concurrently
pub async fn fetch_pair<P: PriceHistoryPort + ?Sized>(
    port: &P,
    asset_a: &str,
    asset_b: &str,
    vs_currency: &str,
    range: HistoryRange,
) -> Result<(Vec<PricePoint>, Vec<PricePoint>), PriceHistoryError> {
    range.validate()?;
    tracing::info!(
        "Fetching {} and {} ({}) from {}: {:?}",
        asset_a,
        asset_b,
        vs_currency,
        port.source_name(),
        range
    );

    let (leg_a, leg_b) = tokio::try_join!(
        port.fetch_history(asset_a, vs_currency, range),
        port.fetch_history(asset_b, vs_currency, range),
    )?;

    tracing::debug!("Fetched {} points for {}, {} for {}", leg_a.len(), asset_a, leg_b.len(), asset_b);
    Ok((leg_a, leg_b))
}
