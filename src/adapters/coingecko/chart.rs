//! CoinGecko market chart payload
//!
//! `{"prices": [[unix_ms, price], ...], "market_caps": [...], "total_volumes": [...]}`.
//! Only `prices` is used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::series::PricePoint;
use crate::ports::market_data::PriceHistoryError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<[f64; 2]>,
}

impl MarketChart {
    pub fn from_json(body: &str) -> Result<Self, PriceHistoryError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn from_points(points: &[PricePoint]) -> Self {
        Self {
            prices: points
                .iter()
                .map(|p| [p.timestamp.timestamp_millis() as f64, p.price])
                .collect(),
        }
    }

    /// Convert to price points, sorted ascending.
    ///
    /// With `daily` set, timestamps are truncated to midnight UTC so both
    /// legs share the same keys; CoinGecko stamps the latest point with
    /// the request time rather than the day boundary.
    pub fn into_points(self, daily: bool) -> Result<Vec<PricePoint>, PriceHistoryError> {
        let mut points = self
            .prices
            .into_iter()
            .map(|[ms, price]| {
                let timestamp = DateTime::<Utc>::from_timestamp_millis(ms as i64)
                    .ok_or_else(|| PriceHistoryError::ParseError(format!("timestamp out of range: {}", ms)))?;
                let timestamp = if daily { truncate_to_day(timestamp) } else { timestamp };
                Ok(PricePoint::new(timestamp, price))
            })
            .collect::<Result<Vec<_>, PriceHistoryError>>()?;

        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

fn truncate_to_day(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_market_chart() {
        let body = r#"{
            "prices": [[1704153600000, 2.5], [1704067200000, 2.0], [1704200000000, 2.7]],
            "market_caps": [],
            "total_volumes": []
        }"#;

        let points = MarketChart::from_json(body).unwrap().into_points(false).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(points[0].price, 2.0);
        assert_eq!(points[1].price, 2.5);
    }

    #[test]
    fn test_daily_truncation() {
        let body = r#"{"prices": [[1704200000000, 2.7]]}"#;
        let points = MarketChart::from_json(body).unwrap().into_points(true).unwrap();
        assert_eq!(points[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_prices_is_empty() {
        let points = MarketChart::from_json("{}").unwrap().into_points(true).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(MarketChart::from_json("{\"prices\": 3}"), Err(PriceHistoryError::Json(_))));
    }

    #[test]
    fn test_from_points() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let chart = MarketChart::from_points(&[PricePoint::new(t, 1.5)]);
        assert_eq!(chart.prices, vec![[1704067200000.0, 1.5]]);
    }
}
