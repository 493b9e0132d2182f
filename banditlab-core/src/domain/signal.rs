//! Three-valued trading signal.

use serde::{Deserialize, Serialize};

/// Directional signal for one bar: short, flat, or long.
///
/// Serializes as `-1 | 0 | 1` so persisted records and exports stay
/// tool-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Short,
    #[default]
    Flat,
    Long,
}

impl Signal {
    /// Position value used in return arithmetic.
    pub fn as_f64(self) -> f64 {
        match self {
            Signal::Short => -1.0,
            Signal::Flat => 0.0,
            Signal::Long => 1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        matches!(self, Signal::Flat)
    }
}

impl From<Signal> for i8 {
    fn from(s: Signal) -> i8 {
        match s {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }
}

impl TryFrom<i8> for Signal {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Signal::Short),
            0 => Ok(Signal::Flat),
            1 => Ok(Signal::Long),
            other => Err(format!("signal value out of range: {other}")),
        }
    }
}
