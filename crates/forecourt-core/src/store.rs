// Storage collaborator contract
//
// The relational store (stations, tanks, pricing, transactions) is
// external; the gateway only needs these narrow read/write operations.
// `MemoryStore` is the in-process implementation used by tests and by
// the diagnostics CLI's single-station profile.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use thiserror::Error;

use forecourt_pts::ControllerEndpoint;

use crate::model::{PricingRow, StationConfigRow, StationRecord, StationStatus, TankRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("station '{0}' not found")]
    StationNotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Read/write contract the gateway requires of its persistence
/// collaborator. Concurrent access safety is the implementor's concern;
/// the gateway performs no multi-statement transactions.
pub trait StationStore: Send + Sync {
    fn load_station_record(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<StationRecord, StoreError>> + Send;

    /// Controller endpoint for the station, if one is configured.
    /// Reloaded on each connect attempt.
    fn load_endpoint(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Option<ControllerEndpoint>, StoreError>> + Send;

    fn load_tank_rows(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Vec<TankRow>, StoreError>> + Send;

    fn load_active_pricing(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Vec<PricingRow>, StoreError>> + Send;

    fn load_station_config(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Option<StationConfigRow>, StoreError>> + Send;

    /// The gateway's one write-back: last derived status and heartbeat.
    fn save_station_status(
        &self,
        station_id: &str,
        status: StationStatus,
        heartbeat: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ── In-memory implementation ─────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct StationEntry {
    record: Option<StationRecord>,
    endpoint: Option<ControllerEndpoint>,
    tanks: Vec<TankRow>,
    pricing: Vec<PricingRow>,
    config: Option<StationConfigRow>,
}

/// In-memory `StationStore` for tests and the CLI's ad-hoc profile.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stations: Mutex<HashMap<String, StationEntry>>,
    saved: Mutex<Vec<(String, StationStatus, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&self, record: StationRecord) {
        let mut stations = self.stations.lock().expect("store lock poisoned");
        let id = record.id.clone();
        stations.entry(id).or_default().record = Some(record);
    }

    pub fn insert_endpoint(&self, station_id: &str, endpoint: ControllerEndpoint) {
        let mut stations = self.stations.lock().expect("store lock poisoned");
        stations.entry(station_id.to_owned()).or_default().endpoint = Some(endpoint);
    }

    pub fn insert_tanks(&self, station_id: &str, tanks: Vec<TankRow>) {
        let mut stations = self.stations.lock().expect("store lock poisoned");
        stations.entry(station_id.to_owned()).or_default().tanks = tanks;
    }

    pub fn insert_pricing(&self, station_id: &str, pricing: Vec<PricingRow>) {
        let mut stations = self.stations.lock().expect("store lock poisoned");
        stations.entry(station_id.to_owned()).or_default().pricing = pricing;
    }

    pub fn insert_config(&self, station_id: &str, config: StationConfigRow) {
        let mut stations = self.stations.lock().expect("store lock poisoned");
        stations.entry(station_id.to_owned()).or_default().config = Some(config);
    }

    /// Statuses written back through `save_station_status`, oldest first.
    pub fn saved_statuses(&self) -> Vec<(String, StationStatus, DateTime<Utc>)> {
        self.saved.lock().expect("store lock poisoned").clone()
    }

    fn entry(&self, station_id: &str) -> Result<StationEntry, StoreError> {
        let stations = self.stations.lock().expect("store lock poisoned");
        stations
            .get(station_id)
            .cloned()
            .ok_or_else(|| StoreError::StationNotFound(station_id.to_owned()))
    }
}

impl StationStore for MemoryStore {
    async fn load_station_record(&self, station_id: &str) -> Result<StationRecord, StoreError> {
        self.entry(station_id)?
            .record
            .ok_or_else(|| StoreError::StationNotFound(station_id.to_owned()))
    }

    async fn load_endpoint(
        &self,
        station_id: &str,
    ) -> Result<Option<ControllerEndpoint>, StoreError> {
        Ok(self.entry(station_id)?.endpoint)
    }

    async fn load_tank_rows(&self, station_id: &str) -> Result<Vec<TankRow>, StoreError> {
        Ok(self.entry(station_id)?.tanks)
    }

    async fn load_active_pricing(&self, station_id: &str) -> Result<Vec<PricingRow>, StoreError> {
        Ok(self.entry(station_id)?.pricing)
    }

    async fn load_station_config(
        &self,
        station_id: &str,
    ) -> Result<Option<StationConfigRow>, StoreError> {
        Ok(self.entry(station_id)?.config)
    }

    async fn save_station_status(
        &self,
        station_id: &str,
        status: StationStatus,
        heartbeat: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        {
            let mut stations = self.stations.lock().expect("store lock poisoned");
            if let Some(record) = stations
                .get_mut(station_id)
                .and_then(|e| e.record.as_mut())
            {
                record.status = status;
                record.last_heartbeat = Some(heartbeat);
            }
        }
        self.saved
            .lock()
            .expect("store lock poisoned")
            .push((station_id.to_owned(), status, heartbeat));
        Ok(())
    }
}
