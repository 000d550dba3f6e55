//! Backtest Engine
//!
//! Runs the pipeline strictly downstream, one stage at a time:
//! aligned prices -> returns + hedge regression -> spread/z-score ->
//! positions -> costs -> performance.
//!
//! Structural failures (no overlapping rows, degenerate regression) abort
//! the run and name the stage. Numeric degeneracies inside a stage (zero
//! rolling std, zero return dispersion) only mark individual values as
//! undefined and the run completes.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::cost::{CostError, CostPoint};
use crate::domain::performance::{PerformanceAnalyzer, PerformanceError, PerformancePoint, PerformanceReport};
use crate::domain::position::PositionVector;
use crate::domain::series::{AlignedSeries, PricePoint, ReturnSeries, SeriesError};
use crate::ports::market_data::{fetch_pair, HistoryRange, PriceHistoryError, PriceHistoryPort};
use crate::strategy::correlation::{CorrelationSummary, ReturnCorrelation};
use crate::strategy::params::{BacktestConfig, ConfigError};
use crate::strategy::position_rule::{PositionRule, PositionRuleError};
use crate::strategy::regression::{HedgeRatioEstimator, RegressionError, RegressionResult};
use crate::strategy::spread::{SpreadPoint, SpreadSignalEngine};

/// Pipeline stage, used to report where a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Align,
    Regression,
    Positions,
    Costs,
    Performance,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Align => "series alignment",
            Stage::Regression => "hedge regression",
            Stage::Positions => "position rule",
            Stage::Costs => "cost model",
            Stage::Performance => "performance analysis",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Series alignment failed: {0}")]
    Series(#[from] SeriesError),
    #[error("Hedge regression failed: {0}")]
    Regression(#[from] RegressionError),
    #[error("Position rule failed: {0}")]
    Positions(#[from] PositionRuleError),
    #[error("Cost model failed: {0}")]
    Costs(#[from] CostError),
    #[error("Performance analysis failed: {0}")]
    Performance(#[from] PerformanceError),
}

impl BacktestError {
    pub fn stage(&self) -> Stage {
        match self {
            BacktestError::Config(_) => Stage::Config,
            BacktestError::Series(_) => Stage::Align,
            BacktestError::Regression(_) => Stage::Regression,
            BacktestError::Positions(_) => Stage::Positions,
            BacktestError::Costs(_) => Stage::Costs,
            BacktestError::Performance(_) => Stage::Performance,
        }
    }
}

/// Failure of a fetch-then-backtest run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Price history fetch failed: {0}")]
    Fetch(#[from] PriceHistoryError),
    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

/// Everything one run produced. Read-only snapshot for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestRun {
    pub config: BacktestConfig,
    pub series: AlignedSeries,
    pub returns: ReturnSeries,
    pub regression: RegressionResult,
    pub spread: Vec<SpreadPoint>,
    pub positions: Vec<PositionVector>,
    pub costs: Vec<CostPoint>,
    pub performance: Vec<PerformancePoint>,
    pub correlation: CorrelationSummary,
    pub report: PerformanceReport,
}

impl BacktestRun {
    /// Bars where an entry signal opened or flipped the position
    pub fn entries(&self) -> impl Iterator<Item = &PositionVector> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(i, pv)| {
                pv.signal.is_entry() && (*i == 0 || self.positions[i - 1].position != pv.position)
            })
            .map(|(_, pv)| pv)
    }

    pub fn strategy_returns(&self) -> Vec<f64> {
        self.performance.iter().map(|p| p.strategy_return).collect()
    }
}

/// Pairs backtest with an immutable, validated configuration
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Align two raw histories and run the full pipeline
    pub fn run(&self, leg_a: &[PricePoint], leg_b: &[PricePoint]) -> Result<BacktestRun, BacktestError> {
        let series = AlignedSeries::align(leg_a, leg_b)?;
        self.run_aligned(series)
    }

    /// Fetch both legs from `port` concurrently, then run
    pub async fn fetch_and_run<P: PriceHistoryPort + ?Sized>(
        &self,
        port: &P,
        asset_a: &str,
        asset_b: &str,
        vs_currency: &str,
        range: HistoryRange,
    ) -> Result<BacktestRun, RunError> {
        let (leg_a, leg_b) = fetch_pair(port, asset_a, asset_b, vs_currency, range).await?;
        Ok(self.run(&leg_a, &leg_b)?)
    }

    /// Run the pipeline on an already aligned table
    pub fn run_aligned(&self, series: AlignedSeries) -> Result<BacktestRun, BacktestError> {
        let config = &self.config;
        tracing::info!(
            "Backtest over {} rows ({} .. {}), window={}, z_open={}, z_close={}, policy={:?}",
            series.len(),
            series.first().timestamp.date_naive(),
            series.last().timestamp.date_naive(),
            config.rolling_window,
            config.z_open,
            config.z_close,
            config.position_policy
        );

        let returns = series.returns();
        let correlation = ReturnCorrelation::new(config.correlation_window).compute(&returns);

        let regression = HedgeRatioEstimator::new(config.training.clone()).estimate(&series)?;

        let spread = SpreadSignalEngine::new(config.rolling_window).compute(&series, &regression);

        let positions = PositionRule::from_config(config).apply(&spread, &series)?;

        let costs = config.cost_model().apply(&positions, &series)?;

        let (performance, report) =
            PerformanceAnalyzer::new(config.annualization_factor).analyze(&returns, &positions, &costs)?;

        tracing::info!(
            "Backtest done: cumulative={:.4}, trades={}, sharpe={:.4}, max_drawdown={:.2}%",
            report.final_cumulative_return,
            report.total_trades,
            report.sharpe_ratio,
            report.max_drawdown * 100.0
        );

        Ok(BacktestRun {
            config: config.clone(),
            series,
            returns,
            regression,
            spread,
            positions,
            costs,
            performance,
            correlation,
            report,
        })
    }
}
