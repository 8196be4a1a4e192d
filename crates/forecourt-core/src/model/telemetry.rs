// Normalized device telemetry
//
// Ephemeral snapshots converted from jsonPTS wire entries: product codes
// mapped to grades, units made explicit. Owned by one in-flight request
// and never cached as the source of truth while the controller is
// reachable.

use serde::Serialize;

use forecourt_pts::Product;
use forecourt_pts::pts::wire::{AlarmEntry, DeliveryEntry, TankEntry};

use crate::model::station::TankRow;

// Alarm thresholds applied to live tank reads, matching the persisted
// rows' alarm flags.
const LOW_LEVEL_LITRES: f64 = 1000.0;
const HIGH_ULLAGE_LITRES: f64 = 500.0;

/// Point-in-time tank probe reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankSnapshot {
    pub tank: u32,
    pub product: Product,
    pub volume_litres: f64,
    pub tc_volume_litres: f64,
    pub ullage_litres: f64,
    pub height_mm: f64,
    pub water_mm: f64,
    pub temperature_c: f64,
}

impl TankSnapshot {
    pub fn from_wire(entry: &TankEntry) -> Self {
        Self {
            tank: entry.tank,
            product: Product::from_code(entry.product),
            volume_litres: entry.volume,
            tc_volume_litres: entry.tc_volume,
            ullage_litres: entry.ullage,
            height_mm: entry.height,
            water_mm: entry.water,
            temperature_c: entry.temperature,
        }
    }

    /// Volume plus ullage: the tank's physical capacity.
    pub fn capacity_litres(&self) -> f64 {
        self.volume_litres + self.ullage_litres
    }
}

/// One hose's current delivery counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliverySnapshot {
    pub hose: u32,
    pub product: Product,
    pub volume_litres: f64,
    pub amount: f64,
    pub unit_price: f64,
}

impl DeliverySnapshot {
    pub fn from_wire(entry: &DeliveryEntry) -> Self {
        Self {
            hose: entry.hose,
            product: Product::from_code(entry.product),
            volume_litres: entry.volume,
            amount: entry.amount,
            unit_price: entry.price,
        }
    }

    /// Fuel is flowing on this hose.
    pub fn is_active(&self) -> bool {
        self.volume_litres > 0.0
    }
}

/// One controller alarm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSnapshot {
    pub id: u32,
    pub priority: u32,
    pub active: bool,
    pub acknowledged: bool,
    pub text: String,
}

impl AlarmSnapshot {
    pub fn from_wire(entry: &AlarmEntry) -> Self {
        Self {
            id: entry.id,
            priority: entry.priority,
            active: entry.active,
            acknowledged: entry.acknowledged,
            text: entry.text.clone(),
        }
    }

    /// Active and nobody has acknowledged it yet.
    pub fn needs_attention(&self) -> bool {
        self.active && !self.acknowledged
    }
}

/// One successful live read of deliveries and alarms.
#[derive(Debug, Clone, Serialize)]
pub struct StationTelemetry {
    pub deliveries: Vec<DeliverySnapshot>,
    pub alarms: Vec<AlarmSnapshot>,
}

/// Tank state normalized for display: the same shape whether it came
/// from a live probe or from persisted fallback rows.
#[derive(Debug, Clone, Serialize)]
pub struct TankStatus {
    pub tank: u32,
    pub product: Product,
    pub level_litres: f64,
    pub capacity_litres: f64,
    pub temperature_c: f64,
    pub low_level_alarm: bool,
    pub high_level_alarm: bool,
}

impl TankStatus {
    pub fn from_snapshot(snapshot: &TankSnapshot) -> Self {
        Self {
            tank: snapshot.tank,
            product: snapshot.product,
            level_litres: snapshot.volume_litres,
            capacity_litres: snapshot.capacity_litres(),
            temperature_c: snapshot.temperature_c,
            low_level_alarm: snapshot.volume_litres < LOW_LEVEL_LITRES,
            high_level_alarm: snapshot.ullage_litres < HIGH_ULLAGE_LITRES,
        }
    }

    pub fn from_row(row: &TankRow) -> Self {
        Self {
            tank: row.tank,
            product: row.product,
            level_litres: row.level_litres,
            capacity_litres: row.capacity_litres,
            temperature_c: row.temperature_c,
            low_level_alarm: row.low_level_alarm,
            high_level_alarm: row.high_level_alarm,
        }
    }
}
