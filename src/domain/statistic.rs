use std::fmt;

use serde::{Deserialize, Serialize};

/// A reported statistic that may be undefined.
///
/// Ratios whose denominator is zero are `Undefined` instead of silently
/// defaulting to zero. Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statistic {
    Value(f64),
    Undefined,
}

impl Statistic {
    /// `numerator / denominator`, undefined for a zero or non-finite result
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Statistic::Undefined;
        }
        Self::from_f64(numerator / denominator)
    }

    /// Wrap a computed value, mapping NaN/inf to `Undefined`
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Statistic::Value(value)
        } else {
            Statistic::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Statistic::Value(v) => Some(v),
            Statistic::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Statistic::Value(_))
    }
}

impl From<Option<f64>> for Statistic {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Statistic::Undefined, Statistic::from_f64)
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Value(v) => fmt::Display::fmt(v, f),
            Statistic::Undefined => f.write_str("undefined"),
        }
    }
}
