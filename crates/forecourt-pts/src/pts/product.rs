// Product code mapping
//
// The controller reports products as small integers; the mapping to fuel
// grades is fixed vendor configuration. An unmapped code maps to the
// `Unknown` sentinel rather than failing the whole response.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Fuel grade dispensed by a hose or held in a tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Product {
    Ron95,
    Ron97,
    Diesel,
    PremiumDiesel,
    Unknown,
}

impl Product {
    /// Map a controller product code to a grade.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Ron95,
            2 => Self::Ron97,
            3 => Self::Diesel,
            4 => Self::PremiumDiesel,
            _ => Self::Unknown,
        }
    }

    /// The controller code for this grade, if it has one.
    pub fn code(self) -> Option<u32> {
        match self {
            Self::Ron95 => Some(1),
            Self::Ron97 => Some(2),
            Self::Diesel => Some(3),
            Self::PremiumDiesel => Some(4),
            Self::Unknown => None,
        }
    }
}
