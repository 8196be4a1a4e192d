// Domain model: persisted records, normalized telemetry, refill types.

pub mod refill;
pub mod station;
pub mod telemetry;

pub use refill::{PresetKind, RefillOutcome, RefillPreset, RefillQuote, StopReason};
pub use station::{PricingRow, StationConfigRow, StationRecord, StationStatus, TankRow};
pub use telemetry::{
    AlarmSnapshot, DeliverySnapshot, StationTelemetry, TankSnapshot, TankStatus,
};
