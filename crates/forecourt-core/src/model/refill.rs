// Refill domain types: preset, quote, outcome.

use serde::{Deserialize, Serialize};
use strum::Display;

use forecourt_pts::{AuthorizeKind, Product};

/// What the user fixed when presetting the refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetKind {
    Volume,
    Amount,
}

impl From<PresetKind> for AuthorizeKind {
    fn from(kind: PresetKind) -> Self {
        match kind {
            PresetKind::Volume => Self::Volume,
            PresetKind::Amount => Self::Amount,
        }
    }
}

/// User refill request: a target volume in litres or a target amount in
/// currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefillPreset {
    pub product: Product,
    pub kind: PresetKind,
    pub value: f64,
}

/// Validated quote: both targets made explicit, hold computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefillQuote {
    pub target_volume_litres: f64,
    pub target_amount: f64,
    pub unit_price: f64,
    /// Wallet pre-authorization: target amount plus the buffer fraction.
    pub hold_amount: f64,
    /// Set when the refill would leave the tank below the low-tank
    /// threshold. Advisory only, never a rejection.
    pub low_tank_advisory: bool,
}

/// Why dispensing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    TargetReached,
    UserStopped,
    EmergencyStop,
}

/// Settled refill: actual charge reconciled against the hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefillOutcome {
    pub actual_volume_litres: f64,
    pub actual_amount: f64,
    pub hold_amount: f64,
    pub refund_amount: f64,
    pub stop_reason: StopReason,
}
