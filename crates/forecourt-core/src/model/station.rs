// Persisted station records
//
// These mirror the fields the gateway reads from (and narrowly writes
// back to) the external relational store. The store itself is a
// collaborator behind the `StationStore` trait; no schema lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use forecourt_pts::Product;

/// Authoritative station state, derived from telemetry while the
/// controller is reachable and persisted as a last-known value for
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    Idle,
    Dispensing,
    Alarm,
    /// Persisted/operator-set; live telemetry never produces this.
    Offline,
    /// Operator-set; takes precedence over telemetry.
    Maintenance,
}

/// Persisted station record, read-mostly.
#[derive(Debug, Clone)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub status: StationStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Persisted tank row, the fallback source when the controller cannot
/// be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankRow {
    pub tank: u32,
    pub product: Product,
    pub level_litres: f64,
    pub capacity_litres: f64,
    pub temperature_c: f64,
    pub low_level_alarm: bool,
    pub high_level_alarm: bool,
}

/// Active pricing row for one product at one station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRow {
    pub product: Product,
    pub unit_price: f64,
    pub currency: String,
}

/// Operator-set station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfigRow {
    pub max_dispense_volume: f64,
    pub max_dispense_amount: f64,
    pub maintenance_mode: bool,
}
