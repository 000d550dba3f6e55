//! Performance Analytics
//!
//! Turns positions, leg returns and costs into the strategy's return
//! stream and summarizes it:
//!
//! - strategy return: `Σ_leg pos[t-1]·r[t] - cost[t]` (positions lagged
//!   one bar, so a bar's signal never earns that same bar's return)
//! - cumulative return: running product of `1 + r`
//! - annualized Sharpe ratio: `mean / std · √annualization`
//! - drawdown from the running peak of the cumulative curve
//! - trade count and average holding period

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::domain::cost::CostPoint;
use crate::domain::position::{PairPosition, PositionVector};
use crate::domain::series::ReturnSeries;
use crate::domain::statistic::Statistic;

/// Below this the return stream is treated as having no dispersion
const MIN_RETURN_STD: f64 = 1e-12;

/// Daily bars
pub const DEFAULT_ANNUALIZATION: u32 = 252;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PerformanceError {
    #[error("Input lengths disagree: {positions} positions, {costs} costs, {returns} returns (expected returns = positions - 1)")]
    LengthMismatch {
        positions: usize,
        costs: usize,
        returns: usize,
    },
    #[error("Nothing to analyze: empty position series")]
    Empty,
}

/// One bar of the equity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub timestamp: DateTime<Utc>,
    pub strategy_return: f64,
    pub cumulative_return: f64,
    pub drawdown: f64,
}

/// End-of-run summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub final_cumulative_return: f64,
    pub total_trades: usize,
    pub total_observations: usize,
    /// Observations per trade; undefined when no trade happened
    pub avg_holding_days: Statistic,
    pub sharpe_ratio: Statistic,
    /// Most negative drawdown, always <= 0
    pub max_drawdown: f64,
    pub total_cost: f64,
}

impl PerformanceReport {
    pub fn has_trades(&self) -> bool {
        self.total_trades > 0
    }
}

/// Streaming cumulative-return and drawdown accumulator
#[derive(Debug, Clone)]
pub struct EquityCurve {
    cumulative: f64,
    peak: f64,
    max_drawdown: f64,
    started: bool,
}

impl Default for EquityCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl EquityCurve {
    pub fn new() -> Self {
        Self {
            cumulative: 1.0,
            peak: f64::NEG_INFINITY,
            max_drawdown: 0.0,
            started: false,
        }
    }

    /// Compound one period's return; yields `(cumulative, drawdown)`
    pub fn update(&mut self, period_return: f64) -> (f64, f64) {
        self.cumulative *= 1.0 + period_return;
        self.peak = if self.started {
            self.peak.max(self.cumulative)
        } else {
            self.cumulative
        };
        self.started = true;

        let drawdown = (self.cumulative - self.peak) / self.peak;
        self.max_drawdown = self.max_drawdown.min(drawdown);
        (self.cumulative, drawdown)
    }

    pub fn cumulative(&self) -> f64 {
        self.cumulative
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }
}

/// Annualized Sharpe ratio of a return stream (sample standard deviation)
pub fn sharpe_ratio(returns: &[f64], annualization_factor: u32) -> Statistic {
    if returns.len() < 2 {
        return Statistic::Undefined;
    }
    let mean = returns.iter().mean();
    let std = returns.iter().std_dev();
    if !std.is_finite() || std < MIN_RETURN_STD {
        return Statistic::Undefined;
    }
    Statistic::from_f64(mean / std * f64::from(annualization_factor).sqrt())
}

/// Computes the strategy return stream and its summary statistics
#[derive(Debug, Clone, Copy)]
pub struct PerformanceAnalyzer {
    annualization_factor: u32,
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_ANNUALIZATION)
    }
}

impl PerformanceAnalyzer {
    pub fn new(annualization_factor: u32) -> Self {
        Self {
            annualization_factor,
        }
    }

    /// Net strategy returns aligned to the position timestamps.
    ///
    /// The first bar has no realized return, so it only carries its cost.
    pub fn strategy_returns(
        &self,
        returns: &ReturnSeries,
        positions: &[PositionVector],
        costs: &[CostPoint],
    ) -> Result<Vec<f64>, PerformanceError> {
        if positions.is_empty() {
            return Err(PerformanceError::Empty);
        }
        if costs.len() != positions.len() || returns.len() + 1 != positions.len() {
            return Err(PerformanceError::LengthMismatch {
                positions: positions.len(),
                costs: costs.len(),
                returns: returns.len(),
            });
        }

        let mut out = Vec::with_capacity(positions.len());
        out.push(-costs[0].cost);

        for (t, ret) in returns.rows().iter().enumerate() {
            let held: PairPosition = positions[t].position;
            let (pos_a, pos_b) = held.legs();
            let gross = f64::from(pos_a) * ret.return_a + f64::from(pos_b) * ret.return_b;
            out.push(gross - costs[t + 1].cost);
        }

        Ok(out)
    }

    /// Full equity curve plus the summary report
    pub fn analyze(
        &self,
        returns: &ReturnSeries,
        positions: &[PositionVector],
        costs: &[CostPoint],
    ) -> Result<(Vec<PerformancePoint>, PerformanceReport), PerformanceError> {
        let strategy_returns = self.strategy_returns(returns, positions, costs)?;

        let mut curve = EquityCurve::new();
        let points: Vec<PerformancePoint> = positions
            .iter()
            .zip(&strategy_returns)
            .map(|(pv, &r)| {
                let (cumulative_return, drawdown) = curve.update(r);
                PerformancePoint {
                    timestamp: pv.timestamp,
                    strategy_return: r,
                    cumulative_return,
                    drawdown,
                }
            })
            .collect();

        let total_trades = costs.iter().filter(|c| c.is_trade()).count();
        let total_observations = positions.len();
        let avg_holding_days = if total_trades > 0 {
            Statistic::ratio(total_observations as f64, total_trades as f64)
        } else {
            Statistic::Undefined
        };

        let sharpe = sharpe_ratio(&strategy_returns, self.annualization_factor);
        if !sharpe.is_defined() {
            tracing::warn!("Sharpe ratio undefined: strategy returns have zero dispersion");
        }

        let report = PerformanceReport {
            final_cumulative_return: curve.cumulative(),
            total_trades,
            total_observations,
            avg_holding_days,
            sharpe_ratio: sharpe,
            max_drawdown: curve.max_drawdown(),
            total_cost: costs.iter().map(|c| c.cost).sum(),
        };

        Ok((points, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::CostModel;
    use crate::domain::series::{AlignedRow, AlignedSeries};
    use crate::domain::signal::SignalKind;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn series(prices: &[(f64, f64)]) -> AlignedSeries {
        let rows = prices
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

    fn positions(states: &[PairPosition]) -> Vec<PositionVector> {
        states
            .iter()
            .enumerate()
            .map(|(i, &position)| PositionVector {
                timestamp: day(i as i64),
                position,
                signal: SignalKind::Neutral,
            })
            .collect()
    }

    #[test]
    fn test_equity_curve_compounds() {
        let mut curve = EquityCurve::new();
        let (c0, d0) = curve.update(0.10);
        assert_relative_eq!(c0, 1.10);
        assert_eq!(d0, 0.0);

        let (c1, d1) = curve.update(-0.50);
        assert_relative_eq!(c1, 0.55);
        assert_relative_eq!(d1, -0.5);

        let (c2, _) = curve.update(0.0);
        assert_relative_eq!(c2, c1);
        assert_relative_eq!(curve.max_drawdown(), -0.5);
    }

    #[test]
    fn test_drawdown_zero_when_non_decreasing() {
        let mut curve = EquityCurve::new();
        for r in [0.01, 0.0, 0.02, 0.0, 0.005] {
            curve.update(r);
        }
        assert_eq!(curve.max_drawdown(), 0.0);
    }

    #[test]
    fn test_drawdown_from_first_bar_loss_is_zero_at_start() {
        let mut curve = EquityCurve::new();
        let (_, d0) = curve.update(-0.1);
        assert_eq!(d0, 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        let returns = [0.01, 0.02, -0.01, 0.03];
        let mean = 0.0125;
        let var = ((0.01f64 - mean).powi(2)
            + (0.02f64 - mean).powi(2)
            + (-0.01f64 - mean).powi(2)
            + (0.03f64 - mean).powi(2))
            / 3.0;
        let expected = mean / var.sqrt() * 252f64.sqrt();

        let sharpe = sharpe_ratio(&returns, 252).value().unwrap();
        assert_relative_eq!(sharpe, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sharpe_undefined_without_dispersion() {
        assert_eq!(sharpe_ratio(&[0.0; 10], 252), Statistic::Undefined);
        assert_eq!(sharpe_ratio(&[0.01], 252), Statistic::Undefined);
        assert_eq!(sharpe_ratio(&[], 252), Statistic::Undefined);
    }

    #[test]
    fn test_positions_are_lagged() {
        use crate::domain::position::PairPosition::*;
        // A rises 10% on bar 1; a position opened on bar 1 must not earn it
        let prices = series(&[(100.0, 100.0), (110.0, 100.0), (121.0, 100.0)]);
        let path = positions(&[Flat, LongSpread, LongSpread]);
        let costs = CostModel::new(0.0, 0.0).apply(&path, &prices).unwrap();

        let analyzer = PerformanceAnalyzer::default();
        let r = analyzer
            .strategy_returns(&prices.returns(), &path, &costs)
            .unwrap();

        assert_eq!(r.len(), 3);
        assert_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.0);
        assert_relative_eq!(r[2], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_short_leg_earns_negative_return() {
        use crate::domain::position::PairPosition::*;
        let prices = series(&[(100.0, 100.0), (100.0, 90.0)]);
        let path = positions(&[LongSpread, LongSpread]);
        let costs = CostModel::new(0.0, 0.0).apply(&path, &prices).unwrap();

        let r = PerformanceAnalyzer::default()
            .strategy_returns(&prices.returns(), &path, &costs)
            .unwrap();
        assert_relative_eq!(r[1], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_report_counts_trades_and_costs() {
        use crate::domain::position::PairPosition::*;
        let prices = series(&[(10.0, 5.0), (10.0, 5.0), (11.0, 5.0), (11.0, 5.0), (12.0, 6.0)]);
        let path = positions(&[Flat, LongSpread, LongSpread, Flat, Flat]);
        let costs = CostModel::new(0.001, 0.0005).apply(&path, &prices).unwrap();

        let (points, report) = PerformanceAnalyzer::default()
            .analyze(&prices.returns(), &path, &costs)
            .unwrap();

        assert_eq!(points.len(), 5);
        assert_eq!(report.total_trades, 2);
        assert_eq!(report.total_observations, 5);
        assert_eq!(report.avg_holding_days, Statistic::Value(2.5));
        assert_relative_eq!(report.total_cost, (15.0 + 16.0) * 0.0015, epsilon = 1e-12);
        assert!(report.max_drawdown <= 0.0);

        let mut expected = 1.0;
        for (p, point) in points.iter().enumerate() {
            expected *= 1.0 + point.strategy_return;
            assert_relative_eq!(point.cumulative_return, expected, epsilon = 1e-12);
            if p == 0 {
                assert_relative_eq!(point.cumulative_return, 1.0 + point.strategy_return);
            }
        }
        assert_relative_eq!(report.final_cumulative_return, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_no_trades_reports_undefined() {
        let prices = series(&[(10.0, 5.0), (11.0, 6.0), (12.0, 5.5)]);
        let path = positions(&[PairPosition::Flat; 3]);
        let costs = CostModel::default().apply(&path, &prices).unwrap();

        let (_, report) = PerformanceAnalyzer::default()
            .analyze(&prices.returns(), &path, &costs)
            .unwrap();

        assert!(!report.has_trades());
        assert_eq!(report.avg_holding_days, Statistic::Undefined);
        assert_eq!(report.sharpe_ratio, Statistic::Undefined);
        assert_eq!(report.final_cumulative_return, 1.0);
        assert_eq!(report.max_drawdown, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let prices = series(&[(10.0, 5.0), (11.0, 6.0)]);
        let path = positions(&[PairPosition::Flat; 2]);
        let costs = CostModel::default().apply(&path, &prices).unwrap();

        let result = PerformanceAnalyzer::default().strategy_returns(&prices.returns(), &path[..1], &costs);
        assert!(matches!(result, Err(PerformanceError::LengthMismatch { .. })));
        let result = PerformanceAnalyzer::default().strategy_returns(&prices.returns(), &[], &[]);
        assert_eq!(result, Err(PerformanceError::Empty));
    }
}
