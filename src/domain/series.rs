//! Price Series Alignment
//!
//! Inner-joins two raw price histories on timestamp and derives
//! period-over-period returns. Rows missing either leg are dropped;
//! nothing is forward-filled or interpolated.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single observation from a price supplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Usable prices are finite and strictly positive
    fn is_usable(&self) -> bool {
        is_usable_price(self.price)
    }
}

fn is_usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// One row of the joined table: both legs observed at the same timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
}

impl AlignedRow {
    fn is_usable(&self) -> bool {
        is_usable_price(self.price_a) && is_usable_price(self.price_b)
    }
}

/// Per-leg simple returns between two consecutive aligned rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    /// Timestamp of the later row
    pub timestamp: DateTime<Utc>,
    pub return_a: f64,
    pub return_b: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("No overlapping timestamps between the two legs")]
    EmptySeries,
    #[error("Timestamps must be strictly increasing (violated at row {0})")]
    NonMonotonic(usize),
    #[error("Range {start}..{end} is out of bounds for a series of {len} rows")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("Price must be finite and positive (violated at row {0})")]
    InvalidPrice(usize),
}

/// Time-ordered table of both legs with unique, strictly increasing timestamps.
///
/// Never empty once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    rows: Vec<AlignedRow>,
}

impl AlignedSeries {
    /// Inner join of two price histories on timestamp.
    ///
    /// Duplicate timestamps within one leg keep the last observation.
    /// Non-finite or non-positive prices are treated as missing.
    pub fn align(leg_a: &[PricePoint], leg_b: &[PricePoint]) -> Result<Self, SeriesError> {
        let index_a = Self::index(leg_a);
        let index_b = Self::index(leg_b);

        let rows: Vec<AlignedRow> = index_a
            .iter()
            .filter_map(|(ts, &price_a)| {
                index_b.get(ts).map(|&price_b| AlignedRow {
                    timestamp: *ts,
                    price_a,
                    price_b,
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(SeriesError::EmptySeries);
        }

        tracing::debug!(
            "Aligned {} rows from {} / {} raw points",
            rows.len(),
            leg_a.len(),
            leg_b.len()
        );

        Ok(Self { rows })
    }

    /// Build from rows that are already joined.
    ///
    /// Every price must pass the same check `align` applies.
    pub fn from_rows(rows: Vec<AlignedRow>) -> Result<Self, SeriesError> {
        if rows.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        if let Some(i) = rows.iter().position(|r| !r.is_usable()) {
            return Err(SeriesError::InvalidPrice(i));
        }
        if let Some(i) = rows
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(SeriesError::NonMonotonic(i + 1));
        }
        Ok(Self { rows })
    }

    fn index(points: &[PricePoint]) -> BTreeMap<DateTime<Utc>, f64> {
        points
            .iter()
            .filter(|p| p.is_usable())
            .map(|p| (p.timestamp, p.price))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn first(&self) -> &AlignedRow {
        &self.rows[0]
    }

    pub fn last(&self) -> &AlignedRow {
        &self.rows[self.rows.len() - 1]
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    pub fn prices_a(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price_a).collect()
    }

    pub fn prices_b(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price_b).collect()
    }

    /// Contiguous sub-series by row index
    pub fn slice(&self, range: Range<usize>) -> Result<Self, SeriesError> {
        if range.start >= range.end || range.end > self.rows.len() {
            return Err(SeriesError::InvalidRange {
                start: range.start,
                end: range.end,
                len: self.rows.len(),
            });
        }
        Ok(Self {
            rows: self.rows[range].to_vec(),
        })
    }

    /// Row index range covering `from..=to`, or `None` if no row falls inside
    pub fn index_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Range<usize>> {
        let start = self.rows.partition_point(|r| r.timestamp < from);
        let end = self.rows.partition_point(|r| r.timestamp <= to);
        (start < end).then_some(start..end)
    }

    /// Sub-series with timestamps in `from..=to`
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, SeriesError> {
        let range = self.index_range(from, to).ok_or(SeriesError::EmptySeries)?;
        self.slice(range)
    }

    /// Simple returns per leg; one element shorter than the series
    pub fn returns(&self) -> ReturnSeries {
        let rows = self
            .rows
            .windows(2)
            .map(|w| ReturnRow {
                timestamp: w[1].timestamp,
                return_a: w[1].price_a / w[0].price_a - 1.0,
                return_b: w[1].price_b / w[0].price_b - 1.0,
            })
            .collect();
        ReturnSeries { rows }
    }
}

/// Period-over-period returns derived from an [`AlignedSeries`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    rows: Vec<ReturnRow>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ReturnRow] {
        &self.rows
    }

    pub fn returns_a(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.return_a).collect()
    }

    pub fn returns_b(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.return_b).collect()
    }
}
