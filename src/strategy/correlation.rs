//! Return Correlation
//!
//! Pearson correlation between the two legs' period returns, over the
//! whole sample and over a trailing window. A quick check that the pair
//! actually co-moves before trusting the hedge regression.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain::series::ReturnSeries;
use crate::domain::statistic::Statistic;

const MIN_RETURN_STD: f64 = 1e-12;

/// Rolling correlation on one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPoint {
    pub timestamp: DateTime<Utc>,
    /// `Undefined` during warm-up or when a leg has no dispersion
    pub correlation: Statistic,
}

/// Whole-sample and rolling return correlation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub overall: Statistic,
    pub window: usize,
    pub rolling: Vec<CorrelationPoint>,
}

impl CorrelationSummary {
    /// Most recent defined rolling value
    pub fn latest(&self) -> Statistic {
        self.rolling
            .iter()
            .rev()
            .map(|p| p.correlation)
            .find(|c| c.is_defined())
            .unwrap_or(Statistic::Undefined)
    }
}

/// Sample Pearson correlation of two equally long slices
pub fn pearson(a: &[f64], b: &[f64]) -> Statistic {
    if a.len() != b.len() || a.len() < 2 {
        return Statistic::Undefined;
    }
    let std_a = a.iter().std_dev();
    let std_b = b.iter().std_dev();
    if !(std_a >= MIN_RETURN_STD && std_b >= MIN_RETURN_STD) {
        return Statistic::Undefined;
    }
    let covariance = a.iter().covariance(b.iter());
    Statistic::from_f64((covariance / (std_a * std_b)).clamp(-1.0, 1.0))
}

pub struct ReturnCorrelation {
    window: usize,
}

impl ReturnCorrelation {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn compute(&self, returns: &ReturnSeries) -> CorrelationSummary {
        let ra = returns.returns_a();
        let rb = returns.returns_b();

        let rolling = returns
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let correlation = if self.window >= 2 && i + 1 >= self.window {
                    let start = i + 1 - self.window;
                    pearson(&ra[start..=i], &rb[start..=i])
                } else {
                    Statistic::Undefined
                };
                CorrelationPoint {
                    timestamp: row.timestamp,
                    correlation,
                }
            })
            .collect();

        let overall = pearson(&ra, &rb);
        tracing::debug!("Overall daily return correlation: {:.4}", overall);

        CorrelationSummary {
            overall,
            window: self.window,
            rolling,
        }
    }
}
