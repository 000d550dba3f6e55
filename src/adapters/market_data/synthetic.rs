//! Synthetic co-moving pair.
//!
//! Leg B follows a geometric random walk. Leg A is `alpha + beta·B` plus a
//! mean-reverting (AR(1)) residual, so the pair is cointegrated by
//! construction and the backtest has something to trade.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::domain::series::PricePoint;
use crate::ports::market_data::{HistoryRange, PriceHistoryError, PriceHistoryPort};

/// Asset id that `SyntheticPair` serves as leg A
pub const SYNTHETIC_A: &str = "synthetic-a";
/// Asset id that `SyntheticPair` serves as leg B
pub const SYNTHETIC_B: &str = "synthetic-b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPairConfig {
    pub days: usize,
    pub seed: u64,
    pub start_price_b: f64,
    /// Daily log-volatility of leg B
    pub volatility_b: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Per-day pull of the residual back to zero, in (0, 1]
    pub reversion_speed: f64,
    /// Std of the residual's daily shock
    pub residual_volatility: f64,
}

impl Default for SyntheticPairConfig {
    fn default() -> Self {
        Self {
            days: 365,
            seed: 42,
            start_price_b: 2.0,
            volatility_b: 0.03,
            alpha: 0.5,
            beta: 1.2,
            reversion_speed: 0.15,
            residual_volatility: 0.04,
        }
    }
}

/// Pre-generated pair, served through the price history port
#[derive(Debug, Clone)]
pub struct SyntheticPair {
    config: SyntheticPairConfig,
    leg_a: Vec<PricePoint>,
    leg_b: Vec<PricePoint>,
}

impl SyntheticPair {
    pub fn generate(config: SyntheticPairConfig, start: DateTime<Utc>) -> Result<Self, PriceHistoryError> {
        let shock = Normal::new(0.0, 1.0).map_err(|e| PriceHistoryError::ParseError(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut leg_a = Vec::with_capacity(config.days);
        let mut leg_b = Vec::with_capacity(config.days);
        let mut price_b = config.start_price_b;
        let mut residual = 0.0_f64;

        for day in 0..config.days {
            let timestamp = start + Duration::days(day as i64);
            if day > 0 {
                let z: f64 = shock.sample(&mut rng);
                price_b *= (config.volatility_b * z - 0.5 * config.volatility_b.powi(2)).exp();
                let e: f64 = shock.sample(&mut rng);
                residual = residual * (1.0 - config.reversion_speed) + config.residual_volatility * e;
            }
            let price_a = config.alpha + config.beta * price_b + residual;

            leg_b.push(PricePoint::new(timestamp, price_b));
            // Non-positive A prices are dropped by alignment, so clamp to keep rows
            leg_a.push(PricePoint::new(timestamp, price_a.max(f64::EPSILON)));
        }

        tracing::debug!(
            "Generated synthetic pair: {} days, seed={}, beta={}",
            config.days,
            config.seed,
            config.beta
        );
        Ok(Self { config, leg_a, leg_b })
    }

    /// Start the series at 2024-01-01 UTC
    pub fn with_default_start(config: SyntheticPairConfig) -> Result<Self, PriceHistoryError> {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| PriceHistoryError::InvalidRange("invalid start date".into()))?;
        Self::generate(config, start)
    }

    pub fn config(&self) -> &SyntheticPairConfig {
        &self.config
    }

    pub fn leg_a(&self) -> &[PricePoint] {
        &self.leg_a
    }

    pub fn leg_b(&self) -> &[PricePoint] {
        &self.leg_b
    }
}

#[async_trait]
impl PriceHistoryPort for SyntheticPair {
    async fn fetch_history(
        &self,
        asset: &str,
        _vs_currency: &str,
        range: HistoryRange,
    ) -> Result<Vec<PricePoint>, PriceHistoryError> {
        let leg = match asset {
            SYNTHETIC_A => &self.leg_a,
            SYNTHETIC_B => &self.leg_b,
            _ => return Ok(Vec::new()),
        };
        Ok(range.select(leg))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_series() {
        let a = SyntheticPair::with_default_start(SyntheticPairConfig::default()).unwrap();
        let b = SyntheticPair::with_default_start(SyntheticPairConfig::default()).unwrap();
        assert_eq!(a.leg_a(), b.leg_a());
        assert_eq!(a.leg_b(), b.leg_b());
    }

    #[test]
    fn test_different_seed_differs() {
        let a = SyntheticPair::with_default_start(SyntheticPairConfig::default()).unwrap();
        let b = SyntheticPair::with_default_start(SyntheticPairConfig {
            seed: 7,
            ..SyntheticPairConfig::default()
        })
        .unwrap();
        assert_ne!(a.leg_b(), b.leg_b());
    }

    #[test]
    fn test_shape_and_positive_prices() {
        let pair = SyntheticPair::with_default_start(SyntheticPairConfig {
            days: 50,
            ..SyntheticPairConfig::default()
        })
        .unwrap();
        assert_eq!(pair.leg_a().len(), 50);
        assert_eq!(pair.leg_b().len(), 50);
        assert!(pair.leg_a().iter().chain(pair.leg_b()).all(|p| p.price > 0.0));
        assert!(pair.leg_a().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(pair.leg_b()[0].price, 2.0);
    }

    #[tokio::test]
    async fn test_serves_legs_through_port() {
        let pair = SyntheticPair::with_default_start(SyntheticPairConfig {
            days: 20,
            ..SyntheticPairConfig::default()
        })
        .unwrap();

        let a = pair.fetch_history(SYNTHETIC_A, "usd", HistoryRange::LastDays(9)).await.unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a[9], pair.leg_a()[19]);

        let unknown = pair.fetch_history("bitcoin", "usd", HistoryRange::LastDays(9)).await.unwrap();
        assert!(unknown.is_empty());
    }
}
