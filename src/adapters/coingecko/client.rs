//! CoinGecko API Client
//!
//! HTTP client for the CoinGecko `/coins/{id}/market_chart` endpoints.
//! Trailing windows use `market_chart?days=N&interval=daily`, explicit
//! windows use `market_chart/range?from=..&to=..` (unix seconds).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use super::chart::MarketChart;
use crate::domain::series::PricePoint;
use crate::ports::market_data::{HistoryRange, PriceHistoryError, PriceHistoryPort};

const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// CoinGecko client configuration
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub api_base_url: String,
    /// Optional demo/pro key for higher rate limits
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Number of attempts on 429 and 5xx responses
    pub max_retries: u32,
    /// Truncate timestamps to midnight UTC
    pub daily: bool,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            api_base_url: COINGECKO_API.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            daily: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    http: Client,
}

impl CoinGeckoClient {
    pub fn new() -> Result<Self, PriceHistoryError> {
        Self::with_config(CoinGeckoConfig::default())
    }

    pub fn with_config(config: CoinGeckoConfig) -> Result<Self, PriceHistoryError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }

    fn request(&self, asset: &str, vs_currency: &str, range: HistoryRange) -> RequestBuilder {
        let req = match range {
            HistoryRange::LastDays(days) => self
                .http
                .get(format!("{}/coins/{}/market_chart", self.config.api_base_url, asset))
                .query(&[
                    ("vs_currency", vs_currency.to_string()),
                    ("days", days.to_string()),
                    ("interval", "daily".to_string()),
                ]),
            HistoryRange::Between { from, to } => self
                .http
                .get(format!("{}/coins/{}/market_chart/range", self.config.api_base_url, asset))
                .query(&[
                    ("vs_currency", vs_currency.to_string()),
                    ("from", from.timestamp().to_string()),
                    ("to", to.timestamp().to_string()),
                ]),
        };

        match self.config.api_key {
            Some(ref api_key) => req.header(API_KEY_HEADER, api_key),
            None => req,
        }
    }

    /// Send with backoff on rate limiting and server errors
    async fn send_with_retry(&self, req: RequestBuilder) -> Result<reqwest::Response, PriceHistoryError> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries.max(1) {
            let attempt_req = req
                .try_clone()
                .ok_or_else(|| PriceHistoryError::ParseError("request body is not cloneable".into()))?;

            match attempt_req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                        tracing::warn!(
                            "CoinGecko rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            self.config.max_retries
                        );
                        last_error = Some(PriceHistoryError::Api {
                            status: status.as_u16(),
                            message: "rate limit exceeded".into(),
                        });
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    if status.is_server_error() {
                        last_error = Some(PriceHistoryError::Api {
                            status: status.as_u16(),
                            message: "server error".into(),
                        });
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    last_error = Some(PriceHistoryError::Http(e));
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PriceHistoryError::Api {
            status: 0,
            message: "max retries exceeded".into(),
        }))
    }
}

#[async_trait]
impl PriceHistoryPort for CoinGeckoClient {
    async fn fetch_history(
        &self,
        asset: &str,
        vs_currency: &str,
        range: HistoryRange,
    ) -> Result<Vec<PricePoint>, PriceHistoryError> {
        range.validate()?;
        let response = self.send_with_retry(self.request(asset, vs_currency, range)).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            tracing::warn!("CoinGecko has no history for '{}' in {}", asset, vs_currency);
            return Ok(Vec::new());
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PriceHistoryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let points = MarketChart::from_json(&body)?.into_points(self.config.daily)?;
        tracing::debug!("CoinGecko returned {} points for {}", points.len(), asset);
        Ok(points)
    }

    fn source_name(&self) -> &str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_client_creation() {
        let client = CoinGeckoClient::new().unwrap();
        assert_eq!(client.api_base_url(), COINGECKO_API);
    }

    #[test]
    fn test_trailing_request_url() {
        let client = CoinGeckoClient::new().unwrap();
        let req = client
            .request("optimism", "usd", HistoryRange::LastDays(200))
            .build()
            .unwrap();

        assert_eq!(req.url().path(), "/api/v3/coins/optimism/market_chart");
        let query = req.url().query().unwrap();
        assert!(query.contains("vs_currency=usd"));
        assert!(query.contains("days=200"));
        assert!(query.contains("interval=daily"));
        assert!(req.headers().get(API_KEY_HEADER).is_none());
    }

    #[test]
    fn test_range_request_url_and_key() {
        let config = CoinGeckoConfig {
            api_key: Some("demo-key".into()),
            ..CoinGeckoConfig::default()
        };
        let client = CoinGeckoClient::with_config(config).unwrap();
        let range = HistoryRange::Between {
            from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        };
        let req = client.request("arbitrum", "usd", range).build().unwrap();

        assert_eq!(req.url().path(), "/api/v3/coins/arbitrum/market_chart/range");
        let query = req.url().query().unwrap();
        assert!(query.contains("from=1704067200"));
        assert!(query.contains("to=1704153600"));
        assert_eq!(req.headers().get(API_KEY_HEADER).unwrap().to_str().unwrap(), "demo-key");
    }

    #[tokio::test]
    async fn test_rejects_invalid_range_without_request() {
        let client = CoinGeckoClient::new().unwrap();
        let result = client.fetch_history("optimism", "usd", HistoryRange::LastDays(0)).await;
        assert!(matches!(result, Err(PriceHistoryError::InvalidRange(_))));
    }
}
