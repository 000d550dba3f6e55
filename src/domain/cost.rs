//! Transaction Cost Model
//!
//! Charges commission plus slippage on every unit of leg turnover, priced
//! at the same bar's close of the leg that changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::position::{PairPosition, PositionVector};
use crate::domain::series::{AlignedRow, AlignedSeries};

/// Cost charged on one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub timestamp: DateTime<Utc>,
    /// `|ΔposA| + |ΔposB|`
    pub turnover: u8,
    /// Price-weighted turnover: `|ΔposA|·priceA + |ΔposB|·priceB`
    pub notional: f64,
    pub cost: f64,
}

impl CostPoint {
    pub fn is_trade(&self) -> bool {
        self.turnover > 0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CostError {
    #[error("Position count {positions} does not match price rows {prices}")]
    LengthMismatch { positions: usize, prices: usize },
    #[error("Position timestamp does not match price row {0}")]
    TimestampMismatch(usize),
}

/// Proportional commission + slippage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            commission_rate: 0.001,
            slippage_rate: 0.0005,
        }
    }
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    /// Combined rate applied to traded notional
    pub fn total_rate(&self) -> f64 {
        self.commission_rate + self.slippage_rate
    }

    /// Cost of moving from `previous` to `current` at the prices of `row`
    pub fn charge(&self, previous: PairPosition, current: PairPosition, row: &AlignedRow) -> CostPoint {
        let (a0, b0) = previous.legs();
        let (a1, b1) = current.legs();
        let delta_a = f64::from((a1 - a0).unsigned_abs());
        let delta_b = f64::from((b1 - b0).unsigned_abs());

        let notional = delta_a * row.price_a + delta_b * row.price_b;

        CostPoint {
            timestamp: row.timestamp,
            turnover: current.turnover_from(previous),
            notional,
            cost: notional * self.total_rate(),
        }
    }

    /// Cost series aligned one-to-one with `positions`.
    ///
    /// The bar before the first is treated as flat, so an open position on
    /// the first bar pays its entry cost.
    pub fn apply(
        &self,
        positions: &[PositionVector],
        series: &AlignedSeries,
    ) -> Result<Vec<CostPoint>, CostError> {
        if positions.len() != series.len() {
            return Err(CostError::LengthMismatch {
                positions: positions.len(),
                prices: series.len(),
            });
        }

        let mut previous = PairPosition::Flat;
        let mut costs = Vec::with_capacity(positions.len());

        for (i, (pv, row)) in positions.iter().zip(series.rows()).enumerate() {
            if pv.timestamp != row.timestamp {
                return Err(CostError::TimestampMismatch(i));
            }
            costs.push(self.charge(previous, pv.position, row));
            previous = pv.position;
        }

        Ok(costs)
    }
}
