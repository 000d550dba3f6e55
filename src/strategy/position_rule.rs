//! Position Rule
//!
//! Maps each bar's z-score to a hedged pair position:
//!
//! - z < -z_open: long the spread (long A, short B)
//! - z > z_open: short the spread (short A, long B)
//! - |z| < z_close: flat
//! - otherwise: flat under `Recompute`, previous position under `Hold`
//! - undefined z: flat
//!
//! A stop-loss is evaluated first and wins over everything else: when
//! |spread / priceA| exceeds the stop fraction the bar is flat.

use thiserror::Error;

use crate::domain::position::{PairPosition, PositionVector};
use crate::domain::series::AlignedSeries;
use crate::domain::signal::SignalKind;
use crate::strategy::params::{BacktestConfig, PositionPolicy};
use crate::strategy::spread::SpreadPoint;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionRuleError {
    #[error("Spread has {spread} points but the price series has {prices} rows")]
    LengthMismatch { spread: usize, prices: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRule {
    z_open: f64,
    z_close: f64,
    stop_loss_fraction: f64,
    policy: PositionPolicy,
}

impl PositionRule {
    pub fn new(z_open: f64, z_close: f64, stop_loss_fraction: f64, policy: PositionPolicy) -> Self {
        Self {
            z_open,
            z_close,
            stop_loss_fraction,
            policy,
        }
    }

    pub fn from_config(config: &BacktestConfig) -> Self {
        Self::new(
            config.z_open,
            config.z_close,
            config.stop_loss_fraction,
            config.position_policy,
        )
    }

    pub fn policy(&self) -> PositionPolicy {
        self.policy
    }

    /// What the z-score alone says about this bar
    pub fn classify(&self, z_score: Option<f64>) -> SignalKind {
        match z_score {
            None => SignalKind::NoSignal,
            Some(z) if z < -self.z_open => SignalKind::LongEntry,
            Some(z) if z > self.z_open => SignalKind::ShortEntry,
            Some(z) if z.abs() < self.z_close => SignalKind::Exit,
            Some(_) => SignalKind::Neutral,
        }
    }

    pub fn stop_triggered(&self, spread: f64, price_a: f64) -> bool {
        (spread / price_a).abs() > self.stop_loss_fraction
    }

    /// Position for one bar given the previous bar's position
    pub fn decide(
        &self,
        previous: PairPosition,
        z_score: Option<f64>,
        spread: f64,
        price_a: f64,
    ) -> (PairPosition, SignalKind) {
        if self.stop_triggered(spread, price_a) {
            return (PairPosition::Flat, SignalKind::StopLoss);
        }

        let signal = self.classify(z_score);
        let position = match signal {
            SignalKind::LongEntry => PairPosition::LongSpread,
            SignalKind::ShortEntry => PairPosition::ShortSpread,
            SignalKind::Neutral => match self.policy {
                PositionPolicy::Recompute => PairPosition::Flat,
                PositionPolicy::Hold => previous,
            },
            SignalKind::Exit | SignalKind::NoSignal | SignalKind::StopLoss => PairPosition::Flat,
        };
        (position, signal)
    }

    /// Position vector for every bar
    pub fn apply(
        &self,
        spread: &[SpreadPoint],
        series: &AlignedSeries,
    ) -> Result<Vec<PositionVector>, PositionRuleError> {
        if spread.len() != series.len() {
            return Err(PositionRuleError::LengthMismatch {
                spread: spread.len(),
                prices: series.len(),
            });
        }

        let mut previous = PairPosition::Flat;
        let positions: Vec<PositionVector> = spread
            .iter()
            .zip(series.rows())
            .map(|(point, row)| {
                let (position, signal) = self.decide(previous, point.z_score, point.spread, row.price_a);
                previous = position;
                PositionVector {
                    timestamp: point.timestamp,
                    position,
                    signal,
                }
            })
            .collect();

        let stops = positions.iter().filter(|p| p.signal == SignalKind::StopLoss).count();
        tracing::debug!(
            "Position rule ({:?}): {} bars in market, {} stop-loss bars",
            self.policy,
            positions.iter().filter(|p| !p.position.is_flat()).count(),
            stops
        );

        Ok(positions)
    }
}
