//! Spread & Z-Score Engine
//!
//! Applies a fitted hedge regression to every aligned row and
//! standardizes the resulting residual against its trailing window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::series::AlignedSeries;
use crate::strategy::regression::RegressionResult;
use crate::strategy::zscore_gate::ZScoreGate;

/// Rolling std below this fraction of the average priceA counts as zero.
/// Keeps float residue from an exact fit from turning into signals.
const RELATIVE_STD_FLOOR: f64 = 1e-10;

/// Spread and its rolling statistics on one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    /// `None` during the first `window - 1` bars
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    /// `None` during warm-up and whenever the rolling std is zero
    pub z_score: Option<f64>,
}

impl SpreadPoint {
    pub fn has_signal(&self) -> bool {
        self.z_score.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpreadSignalEngine {
    window: usize,
}

impl SpreadSignalEngine {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Spread, rolling mean/std and z-score for every row of `series`
    pub fn compute(&self, series: &AlignedSeries, regression: &RegressionResult) -> Vec<SpreadPoint> {
        let scale = series.rows().iter().map(|r| r.price_a.abs()).sum::<f64>() / series.len() as f64;
        let mut gate = ZScoreGate::new(self.window).with_min_std(RELATIVE_STD_FLOOR * scale);

        let points: Vec<SpreadPoint> = series
            .rows()
            .iter()
            .map(|row| {
                let spread = regression.residual(row.price_a, row.price_b);
                let stats = gate.update(spread);
                SpreadPoint {
                    timestamp: row.timestamp,
                    spread,
                    rolling_mean: stats.map(|s| s.mean),
                    rolling_std: stats.map(|s| s.std_dev),
                    z_score: stats.and_then(|s| s.z_score),
                }
            })
            .collect();

        let undefined = points
            .iter()
            .filter(|p| p.rolling_std.is_some() && p.z_score.is_none())
            .count();
        if undefined > 0 {
            tracing::warn!("{} bars have zero rolling spread std; z-score left undefined", undefined);
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::AlignedRow;
    use crate::strategy::regression::HedgeRatioEstimator;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn series(pairs: &[(f64, f64)]) -> AlignedSeries {
        let rows = pairs
            .iter()
            .enumerate()
            .map(|(i, &(price_a, price_b))| AlignedRow {
                timestamp: day(i as i64),
                price_a,
                price_b,
            })
            .collect();
        AlignedSeries::from_rows(rows).unwrap()
    }

    #[test]
    fn test_warm_up_points_have_no_statistics() {
        let pairs: Vec<(f64, f64)> = (0..10)
            .map(|i| (10.0 + (i as f64).sin(), 5.0 + i as f64 * 0.1))
            .collect();
        let data = series(&pairs);
        let fit = HedgeRatioEstimator::in_sample().estimate(&data).unwrap();

        let points = SpreadSignalEngine::new(4).compute(&data, &fit);
        assert_eq!(points.len(), 10);
        for p in &points[..3] {
            assert!(p.rolling_mean.is_none());
            assert!(p.rolling_std.is_none());
            assert!(!p.has_signal());
        }
        for p in &points[3..] {
            assert!(p.rolling_mean.is_some());
            assert!(p.has_signal());
        }
    }

    #[test]
    fn test_spread_is_regression_residual() {
        let pairs = [(10.0, 4.0), (12.0, 5.0), (13.0, 6.0), (17.0, 7.0)];
        let data = series(&pairs);
        let fit = HedgeRatioEstimator::in_sample().estimate(&data).unwrap();

        let points = SpreadSignalEngine::new(2).compute(&data, &fit);
        for (p, &(a, b)) in points.iter().zip(&pairs) {
            assert_relative_eq!(p.spread, a - (fit.intercept + fit.slope * b), epsilon = 1e-12);
        }
        // OLS residuals sum to zero
        let total: f64 = points.iter().map(|p| p.spread).sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_z_score_uses_trailing_window() {
        let pairs = [(10.0, 4.0), (12.0, 5.0), (13.0, 6.0), (17.0, 7.0)];
        let data = series(&pairs);
        let fit = HedgeRatioEstimator::in_sample().estimate(&data).unwrap();

        let points = SpreadSignalEngine::new(3).compute(&data, &fit);
        let window: Vec<f64> = points[1..4].iter().map(|p| p.spread).collect();
        let mean = window.iter().sum::<f64>() / 3.0;
        let std = (window.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / 2.0).sqrt();

        assert_relative_eq!(points[3].rolling_mean.unwrap(), mean, epsilon = 1e-12);
        assert_relative_eq!(points[3].rolling_std.unwrap(), std, epsilon = 1e-12);
        assert_relative_eq!(points[3].z_score.unwrap(), (window[2] - mean) / std, epsilon = 1e-9);
    }

    #[test]
    fn test_exact_fit_yields_no_z_scores() {
        let pairs: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let b = 1.3 + 0.07 * i as f64 + (i as f64 * 0.3).cos();
                (2.0 * b, b)
            })
            .collect();
        let data = series(&pairs);
        let fit = HedgeRatioEstimator::in_sample().estimate(&data).unwrap();

        let points = SpreadSignalEngine::new(10).compute(&data, &fit);
        assert!(points.iter().all(|p| p.spread.abs() < 1e-9));
        assert!(points.iter().all(|p| p.z_score.is_none()));
    }
}
