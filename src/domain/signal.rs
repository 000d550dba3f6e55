use std::fmt;

use serde::{Deserialize, Serialize};

/// What the position rule saw on a bar.
///
/// Kept alongside every position so the reporting layer can mark entries
/// and exits without re-deriving them from z-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// z-score below `-z_open`
    LongEntry,
    /// z-score above `z_open`
    ShortEntry,
    /// |z-score| below `z_close`
    Exit,
    /// Between the close and open thresholds
    Neutral,
    /// Spread/price ratio breached the stop-loss fraction
    StopLoss,
    /// z-score undefined (warm-up or zero rolling std)
    NoSignal,
}

impl SignalKind {
    pub fn is_entry(self) -> bool {
        matches!(self, SignalKind::LongEntry | SignalKind::ShortEntry)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::LongEntry => write!(f, "LongEntry"),
            SignalKind::ShortEntry => write!(f, "ShortEntry"),
            SignalKind::Exit => write!(f, "Exit"),
            SignalKind::Neutral => write!(f, "Neutral"),
            SignalKind::StopLoss => write!(f, "StopLoss"),
            SignalKind::NoSignal => write!(f, "NoSignal"),
        }
    }
}
