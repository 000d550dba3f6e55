use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::series::PricePoint;
use crate::ports::market_data::{HistoryRange, PriceHistoryError, PriceHistoryPort};

/// In-memory price history that records calls and serves canned data
#[derive(Debug, Default, Clone)]
pub struct MockPriceHistory {
    calls: Arc<Mutex<Vec<String>>>,
    histories: Arc<Mutex<HashMap<String, Vec<PricePoint>>>>,
}

impl MockPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the history served for an asset
    pub fn with_history(self, asset: &str, points: Vec<PricePoint>) -> Self {
        self.histories.lock().unwrap().insert(asset.to_string(), points);
        self
    }

    /// Get all recorded calls
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceHistoryPort for MockPriceHistory {
    async fn fetch_history(
        &self,
        asset: &str,
        _vs_currency: &str,
        range: HistoryRange,
    ) -> Result<Vec<PricePoint>, PriceHistoryError> {
        self.calls.lock().unwrap().push(asset.to_string());
        let points = self
            .histories
            .lock()
            .unwrap()
            .get(asset)
            .cloned()
            .unwrap_or_default();
        Ok(range.select(&points))
    }

    fn source_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_mock_price_history() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mock = MockPriceHistory::new().with_history(
            "bitcoin",
            vec![PricePoint::new(t0, 1.0), PricePoint::new(t0 + Duration::days(10), 2.0)],
        );

        let all = mock.fetch_history("bitcoin", "usd", HistoryRange::LastDays(30)).await.unwrap();
        assert_eq!(all.len(), 2);

        let window = HistoryRange::Between { from: t0, to: t0 + Duration::days(5) };
        let some = mock.fetch_history("bitcoin", "usd", window).await.unwrap();
        assert_eq!(some.len(), 1);

        let none = mock.fetch_history("unknown", "usd", window).await.unwrap();
        assert!(none.is_empty());

        assert_eq!(mock.get_calls().len(), 3);
    }
}
