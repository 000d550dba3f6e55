use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::signal::SignalKind;

/// State of the two-legged pair.
///
/// The legs are always hedged against each other, so a naked single-leg
/// position cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum PairPosition {
    #[default]
    Flat,
    /// Long asset A, short asset B
    LongSpread,
    /// Short asset A, long asset B
    ShortSpread,
}

impl PairPosition {
    /// Leg weights `(posA, posB)`
    pub fn legs(self) -> (i8, i8) {
        match self {
            PairPosition::Flat => (0, 0),
            PairPosition::LongSpread => (1, -1),
            PairPosition::ShortSpread => (-1, 1),
        }
    }

    pub fn pos_a(self) -> i8 {
        self.legs().0
    }

    pub fn pos_b(self) -> i8 {
        self.legs().1
    }

    pub fn is_flat(self) -> bool {
        self == PairPosition::Flat
    }

    /// `|ΔposA| + |ΔposB|` when moving from `previous` to `self`
    pub fn turnover_from(self, previous: PairPosition) -> u8 {
        let (a0, b0) = previous.legs();
        let (a1, b1) = self.legs();
        (a1 - a0).unsigned_abs() + (b1 - b0).unsigned_abs()
    }
}

/// Position held on one bar, with the signal that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionVector {
    pub timestamp: DateTime<Utc>,
    pub position: PairPosition,
    pub signal: SignalKind,
}

impl PositionVector {
    pub fn pos_a(&self) -> i8 {
        self.position.pos_a()
    }

    pub fn pos_b(&self) -> i8 {
        self.position.pos_b()
    }
}
