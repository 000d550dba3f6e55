//! Hedge Ratio Estimation
//!
//! Ordinary least squares of asset A's price on `[1, priceB]`:
//!
//!   priceA = alpha + beta * priceB + e
//!
//! beta is the hedge ratio, alpha the intercept. Coefficient significance
//! uses two-sided Student-t tests with n-2 degrees of freedom.
//!
//! The fit can be restricted to a training window so the same code path
//! serves in-sample runs (fit and trade on the same rows) and
//! out-of-sample runs (fit on history, trade on later rows).

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

use crate::domain::series::AlignedSeries;

/// Variance of priceB below `(RELATIVE_VARIANCE_FLOOR * mean)^2` is treated as zero
const RELATIVE_VARIANCE_FLOOR: f64 = 1e-10;

/// Rows used to fit the regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrainingRange {
    /// Half-open row index range `start..end`
    Rows { start: usize, end: usize },
    /// Inclusive timestamp range
    Dates { from: DateTime<Utc>, to: DateTime<Utc> },
}

impl TrainingRange {
    fn resolve(&self, series: &AlignedSeries) -> Result<Range<usize>, RegressionError> {
        match *self {
            TrainingRange::Rows { start, end } => {
                if start >= end || end > series.len() {
                    return Err(RegressionError::InvalidTrainingRange(format!(
                        "rows {}..{} outside a series of {} rows",
                        start,
                        end,
                        series.len()
                    )));
                }
                Ok(start..end)
            }
            TrainingRange::Dates { from, to } => series.index_range(from, to).ok_or_else(|| {
                RegressionError::InvalidTrainingRange(format!("no rows between {} and {}", from, to))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    #[error("Need at least 2 observations to fit a hedge ratio, got {0}")]
    InsufficientObservations(usize),
    #[error("Regressor has zero variance over the training window")]
    ZeroVariance,
    #[error("Invalid training range: {0}")]
    InvalidTrainingRange(String),
}

/// Fitted hedge regression. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub intercept: f64,
    /// Hedge ratio
    pub slope: f64,
    pub std_error_intercept: f64,
    pub std_error_slope: f64,
    pub t_stat_intercept: f64,
    pub t_stat_slope: f64,
    pub p_value_intercept: f64,
    pub p_value_slope: f64,
    pub r_squared: f64,
    pub observations: usize,
    /// First and last timestamp of the training window
    pub fitted_from: DateTime<Utc>,
    pub fitted_to: DateTime<Utc>,
}

impl RegressionResult {
    /// Predicted priceA for a given priceB
    pub fn predict(&self, price_b: f64) -> f64 {
        self.intercept + self.slope * price_b
    }

    /// Residual `priceA - (alpha + beta * priceB)`
    pub fn residual(&self, price_a: f64, price_b: f64) -> f64 {
        price_a - self.predict(price_b)
    }
}

/// OLS hedge ratio estimator over an optional training window
#[derive(Debug, Clone, Default)]
pub struct HedgeRatioEstimator {
    training: Option<TrainingRange>,
}

impl HedgeRatioEstimator {
    pub fn new(training: Option<TrainingRange>) -> Self {
        Self { training }
    }

    /// Fit on the whole series
    pub fn in_sample() -> Self {
        Self::default()
    }

    /// Fit on the configured window of `series`
    pub fn estimate(&self, series: &AlignedSeries) -> Result<RegressionResult, RegressionError> {
        let range = match &self.training {
            Some(training) => training.resolve(series)?,
            None => 0..series.len(),
        };
        let rows = &series.rows()[range];

        let x: Vec<f64> = rows.iter().map(|r| r.price_b).collect();
        let y: Vec<f64> = rows.iter().map(|r| r.price_a).collect();

        let fit = ols(&x, &y)?;
        let result = RegressionResult {
            intercept: fit.intercept,
            slope: fit.slope,
            std_error_intercept: fit.std_error_intercept,
            std_error_slope: fit.std_error_slope,
            t_stat_intercept: fit.t_stat_intercept,
            t_stat_slope: fit.t_stat_slope,
            p_value_intercept: fit.p_value_intercept,
            p_value_slope: fit.p_value_slope,
            r_squared: fit.r_squared,
            observations: x.len(),
            fitted_from: rows[0].timestamp,
            fitted_to: rows[rows.len() - 1].timestamp,
        };

        tracing::debug!(
            "Hedge regression over {} rows: alpha={:.6}, beta={:.6}, r2={:.4}",
            result.observations,
            result.intercept,
            result.slope,
            result.r_squared
        );

        Ok(result)
    }
}

/// Coefficients and test statistics before they are tied to a window
struct OlsFit {
    intercept: f64,
    slope: f64,
    std_error_intercept: f64,
    std_error_slope: f64,
    t_stat_intercept: f64,
    t_stat_slope: f64,
    p_value_intercept: f64,
    p_value_slope: f64,
    r_squared: f64,
}

/// Simple linear regression `y = a + b x` with coefficient t-tests
fn ols(x: &[f64], y: &[f64]) -> Result<OlsFit, RegressionError> {
    let n = x.len();
    if n < 2 {
        return Err(RegressionError::InsufficientObservations(n));
    }
    let nf = n as f64;

    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= nf * (RELATIVE_VARIANCE_FLOOR * mean_x).powi(2) {
        return Err(RegressionError::ZeroVariance);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ssr: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let e = yi - (intercept + slope * xi);
            e * e
        })
        .sum();

    let r_squared = if syy > 0.0 { 1.0 - ssr / syy } else { 1.0 };

    // With n = 2 the line is exact and there is no residual variance to test against
    let dof = n - 2;
    let (std_error_intercept, std_error_slope, dist) = if dof == 0 {
        (f64::NAN, f64::NAN, None)
    } else {
        let sigma2 = ssr / dof as f64;
        (
            (sigma2 * (1.0 / nf + mean_x * mean_x / sxx)).sqrt(),
            (sigma2 / sxx).sqrt(),
            StudentsT::new(0.0, 1.0, dof as f64).ok(),
        )
    };

    let (t_stat_intercept, p_value_intercept) = t_test(intercept, std_error_intercept, dist.as_ref());
    let (t_stat_slope, p_value_slope) = t_test(slope, std_error_slope, dist.as_ref());

    Ok(OlsFit {
        intercept,
        slope,
        std_error_intercept,
        std_error_slope,
        t_stat_intercept,
        t_stat_slope,
        p_value_intercept,
        p_value_slope,
        r_squared,
    })
}

/// Two-sided t-test of `coef = 0`; returns `(t, p)`
fn t_test(coef: f64, std_error: f64, dist: Option<&StudentsT>) -> (f64, f64) {
    let Some(dist) = dist else {
        return (f64::NAN, f64::NAN);
    };
    if std_error == 0.0 {
        // Perfect fit: any nonzero coefficient is infinitely significant
        return if coef == 0.0 {
            (f64::NAN, f64::NAN)
        } else {
            (f64::INFINITY.copysign(coef), 0.0)
        };
    }
    let t = coef / std_error;
    (t, (2.0 * dist.sf(t.abs())).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::AlignedRow;
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
    fn test_exact_linear_relation() {
        let pairs: Vec<(f64, f64)> = (1..=50)
            .map(|i| {
                let b = 10.0 + i as f64 * 0.5;
                (3.0 + 2.0 * b, b)
            })
            .collect();

        let fit = HedgeRatioEstimator::in_sample().estimate(&series(&pairs)).unwrap();
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-7);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
        assert_eq!(fit.observations, 50);
        assert_eq!(fit.fitted_from, day(0));
        assert_eq!(fit.fitted_to, day(49));
        assert!(fit.p_value_slope < 1e-10);
    }

    #[test]
    fn test_noisy_fit_matches_closed_form() {
        // x = 1..5, y = [2.1, 3.9, 6.2, 7.8, 10.1]
        let pairs = [(2.1, 1.0), (3.9, 2.0), (6.2, 3.0), (7.8, 4.0), (10.1, 5.0)];
        let fit = HedgeRatioEstimator::in_sample().estimate(&series(&pairs)).unwrap();

        // sxy = 19.9, sxx = 10
        assert_relative_eq!(fit.slope, 1.99, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 6.02 - 1.99 * 3.0, epsilon = 1e-12);

        let expected_t = fit.slope / fit.std_error_slope;
        assert_relative_eq!(fit.t_stat_slope, expected_t, epsilon = 1e-12);
        assert!(fit.p_value_slope > 0.0 && fit.p_value_slope < 1e-3);
        assert!(fit.p_value_intercept > 0.05);
        assert!(fit.p_value_intercept <= 1.0);
    }

    #[test]
    fn test_two_points_has_undefined_significance() {
        let fit = HedgeRatioEstimator::in_sample()
            .estimate(&series(&[(1.0, 1.0), (3.0, 2.0)]))
            .unwrap();
        assert_relative_eq!(fit.slope, 2.0);
        assert_relative_eq!(fit.intercept, -1.0);
        assert!(fit.p_value_slope.is_nan());
        assert!(fit.std_error_slope.is_nan());
    }

    #[test]
    fn test_insufficient_observations() {
        let result = HedgeRatioEstimator::in_sample().estimate(&series(&[(1.0, 1.0)]));
        assert_eq!(result, Err(RegressionError::InsufficientObservations(1)));
    }

    #[test]
    fn test_constant_regressor() {
        let pairs = [(1.0, 0.1), (2.0, 0.1), (3.0, 0.1), (4.0, 0.1)];
        let result = HedgeRatioEstimator::in_sample().estimate(&series(&pairs));
        assert_eq!(result, Err(RegressionError::ZeroVariance));
    }

    #[test]
    fn test_small_prices_are_not_degenerate() {
        let pairs: Vec<(f64, f64)> = (0..20)
            .map(|i| {
                let b = 1e-6 * (1.0 + 0.01 * i as f64);
                (3.0 * b, b)
            })
            .collect();
        let fit = HedgeRatioEstimator::in_sample().estimate(&series(&pairs)).unwrap();
        assert_relative_eq!(fit.slope, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_training_rows_only_use_window() {
        // First 10 rows follow a = 2b, the rest a = 5b
        let pairs: Vec<(f64, f64)> = (0..20)
            .map(|i| {
                let b = 1.0 + i as f64;
                if i < 10 { (2.0 * b, b) } else { (5.0 * b, b) }
            })
            .collect();
        let data = series(&pairs);

        let trained = HedgeRatioEstimator::new(Some(TrainingRange::Rows { start: 0, end: 10 }))
            .estimate(&data)
            .unwrap();
        assert_relative_eq!(trained.slope, 2.0, epsilon = 1e-9);
        assert_eq!(trained.observations, 10);
        assert_eq!(trained.fitted_to, day(9));

        let late = HedgeRatioEstimator::new(Some(TrainingRange::Dates { from: day(10), to: day(19) }))
            .estimate(&data)
            .unwrap();
        assert_relative_eq!(late.slope, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_training_range() {
        let data = series(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.5)]);
        let result = HedgeRatioEstimator::new(Some(TrainingRange::Rows { start: 2, end: 9 })).estimate(&data);
        assert!(matches!(result, Err(RegressionError::InvalidTrainingRange(_))));

        let result = HedgeRatioEstimator::new(Some(TrainingRange::Dates { from: day(30), to: day(40) }))
            .estimate(&data);
        assert!(matches!(result, Err(RegressionError::InvalidTrainingRange(_))));
    }

    #[test]
    fn test_residual() {
        let fit = HedgeRatioEstimator::in_sample()
            .estimate(&series(&[(1.0, 1.0), (3.0, 2.0), (5.0, 3.0)]))
            .unwrap();
        assert_relative_eq!(fit.residual(7.5, 4.0), 0.5, epsilon = 1e-12);
    }
}
