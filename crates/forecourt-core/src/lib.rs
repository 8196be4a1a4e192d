//! Station-level domain logic for the forecourt gateway.
//!
//! Sits between the raw device client in `forecourt-pts` and any outer
//! surface: resolves authoritative station status from live telemetry
//! with persisted fallback, normalizes tank and pricing views, and
//! computes refill holds and settlements.

pub mod error;
pub mod model;
pub mod refill;
pub mod status;
pub mod store;

pub use error::CoreError;
pub use refill::{RefillCalculator, RefillPolicy, RefillRejected, StationLimits, TankAvailability};
pub use status::{ResolvedStatus, StationDetail, StatusResolver, TankReport, derive_status};
pub use store::{MemoryStore, StationStore, StoreError};
