// Station status resolution
//
// Reconciles live controller telemetry with the persisted station record
// into one authoritative status. Device unreachability on these read
// paths is an expected, recoverable condition: every failure falls back
// to persisted data and is reported as `controller_reachable = false`,
// never as an error to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use forecourt_pts::{ControllerEndpoint, ControllerTransport, EndpointGates, PtsClient, TransportConfig};

use crate::error::CoreError;
use crate::model::{
    AlarmSnapshot, DeliverySnapshot, PricingRow, StationConfigRow, StationStatus,
    StationTelemetry, TankSnapshot, TankStatus,
};

/// One resolved station status.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedStatus {
    pub station_id: String,
    pub status: StationStatus,
    pub controller_reachable: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Present only when the controller answered.
    pub telemetry: Option<StationTelemetry>,
}

/// Tank readings plus where they came from.
#[derive(Debug, Clone, Serialize)]
pub struct TankReport {
    pub tanks: Vec<TankStatus>,
    /// `true` when read from the controller, `false` for persisted rows.
    pub live: bool,
}

/// Full station detail for display: status, tanks, pricing, config.
#[derive(Debug, Clone, Serialize)]
pub struct StationDetail {
    pub id: String,
    pub name: String,
    pub address: String,
    pub resolved: ResolvedStatus,
    pub tanks: TankReport,
    pub pricing: Vec<PricingRow>,
    pub config: Option<StationConfigRow>,
}

/// Derive status from telemetry by strict precedence: an unacknowledged
/// active alarm beats an active delivery beats idle.
pub fn derive_status(telemetry: &StationTelemetry) -> StationStatus {
    if telemetry.alarms.iter().any(AlarmSnapshot::needs_attention) {
        StationStatus::Alarm
    } else if telemetry.deliveries.iter().any(DeliverySnapshot::is_active) {
        StationStatus::Dispensing
    } else {
        StationStatus::Idle
    }
}

/// Drives the device client against the persisted record to answer
/// status, tank, and detail queries for one gateway instance.
pub struct StatusResolver<S> {
    store: S,
    transport_config: TransportConfig,
    gates: EndpointGates,
}

impl<S: crate::store::StationStore> StatusResolver<S> {
    pub fn new(store: S, transport_config: TransportConfig) -> Self {
        Self {
            store,
            transport_config,
            gates: EndpointGates::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open an authenticated session for a control operation.
    ///
    /// Unlike the read paths, failures here are hard errors: there is no
    /// fallback for a command aimed at physical equipment.
    pub async fn connect(&self, station_id: &str) -> Result<PtsClient, CoreError> {
        let endpoint = self
            .store
            .load_endpoint(station_id)
            .await?
            .ok_or_else(|| CoreError::NoController(station_id.to_owned()))?;
        let transport =
            ControllerTransport::open(&endpoint, &self.transport_config, &self.gates).await?;
        Ok(PtsClient::new(transport))
    }

    /// Resolve one authoritative status for the station.
    ///
    /// Errors only on storage failures (unknown station); controller
    /// failures degrade to the persisted status.
    pub async fn resolve(&self, station_id: &str) -> Result<ResolvedStatus, CoreError> {
        let record = self.store.load_station_record(station_id).await?;
        let config = self.store.load_station_config(station_id).await?;

        // Operator-set maintenance wins before any telemetry is consulted.
        let maintenance = record.status == StationStatus::Maintenance
            || config.as_ref().is_some_and(|c| c.maintenance_mode);
        if maintenance {
            return Ok(ResolvedStatus {
                station_id: record.id,
                status: StationStatus::Maintenance,
                controller_reachable: false,
                last_heartbeat: record.last_heartbeat,
                telemetry: None,
            });
        }

        let Some(endpoint) = self.store.load_endpoint(station_id).await? else {
            debug!(station_id, "no controller configured, using persisted status");
            return Ok(ResolvedStatus {
                station_id: record.id,
                status: record.status,
                controller_reachable: false,
                last_heartbeat: record.last_heartbeat,
                telemetry: None,
            });
        };

        match self.probe(&endpoint).await {
            Ok(telemetry) => {
                let status = derive_status(&telemetry);
                let heartbeat = Utc::now();

                // Best-effort write-back; a storage hiccup must not fail
                // a successful device read.
                if let Err(e) = self
                    .store
                    .save_station_status(station_id, status, heartbeat)
                    .await
                {
                    warn!(station_id, error = %e, "status write-back failed");
                }

                Ok(ResolvedStatus {
                    station_id: record.id,
                    status,
                    controller_reachable: true,
                    last_heartbeat: Some(heartbeat),
                    telemetry: Some(telemetry),
                })
            }
            Err(e) => {
                debug!(station_id, error = %e, "controller unreachable, falling back");
                Ok(ResolvedStatus {
                    station_id: record.id,
                    status: record.status,
                    controller_reachable: false,
                    last_heartbeat: record.last_heartbeat,
                    telemetry: None,
                })
            }
        }
    }

    /// Tank readings with fallback: live probe if possible, otherwise
    /// the last persisted rows. Never errors on device failure.
    pub async fn tank_report(&self, station_id: &str) -> Result<TankReport, CoreError> {
        // Confirm the station exists before touching any device.
        let _record = self.store.load_station_record(station_id).await?;

        if let Some(endpoint) = self.store.load_endpoint(station_id).await? {
            match self.live_tanks(&endpoint).await {
                Ok(snapshots) if !snapshots.is_empty() => {
                    return Ok(TankReport {
                        tanks: snapshots.iter().map(TankStatus::from_snapshot).collect(),
                        live: true,
                    });
                }
                // An empty tank list and a failed read both mean the
                // device gave us nothing usable.
                Ok(_) => debug!(station_id, "controller returned no tanks, falling back"),
                Err(e) => debug!(station_id, error = %e, "tank read failed, falling back"),
            }
        }

        let rows = self.store.load_tank_rows(station_id).await?;
        Ok(TankReport {
            tanks: rows.iter().map(TankStatus::from_row).collect(),
            live: false,
        })
    }

    /// Full station detail. Status and tanks fall back independently: a
    /// controller that answers deliveries/alarms but fails GetTanks
    /// still yields live status with persisted tank rows.
    pub async fn station_detail(&self, station_id: &str) -> Result<StationDetail, CoreError> {
        let record = self.store.load_station_record(station_id).await?;
        let resolved = self.resolve(station_id).await?;
        let tanks = self.tank_report(station_id).await?;
        let pricing = self.store.load_active_pricing(station_id).await?;
        let config = self.store.load_station_config(station_id).await?;

        Ok(StationDetail {
            id: record.id,
            name: record.name,
            address: record.address,
            resolved,
            tanks,
            pricing,
            config,
        })
    }

    /// One live deliveries + alarms read.
    async fn probe(&self, endpoint: &ControllerEndpoint) -> Result<StationTelemetry, forecourt_pts::Error> {
        let transport =
            ControllerTransport::open(endpoint, &self.transport_config, &self.gates).await?;
        let client = PtsClient::new(transport);

        let deliveries = client.deliveries().await?;
        let alarms = client.alarms().await?;

        Ok(StationTelemetry {
            deliveries: deliveries.iter().map(DeliverySnapshot::from_wire).collect(),
            alarms: alarms.iter().map(AlarmSnapshot::from_wire).collect(),
        })
    }

    /// One live tank probe, normalized.
    async fn live_tanks(
        &self,
        endpoint: &ControllerEndpoint,
    ) -> Result<Vec<TankSnapshot>, forecourt_pts::Error> {
        let transport =
            ControllerTransport::open(endpoint, &self.transport_config, &self.gates).await?;
        let client = PtsClient::new(transport);
        let tanks = client.tanks().await?;
        Ok(tanks.iter().map(TankSnapshot::from_wire).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::derive_status;
    use crate::model::{AlarmSnapshot, DeliverySnapshot, StationStatus, StationTelemetry};
    use forecourt_pts::Product;

    fn delivery(volume: f64) -> DeliverySnapshot {
        DeliverySnapshot {
            hose: 1,
            product: Product::Ron95,
            volume_litres: volume,
            amount: volume * 2.05,
            unit_price: 2.05,
        }
    }

    fn alarm(active: bool, acknowledged: bool) -> AlarmSnapshot {
        AlarmSnapshot {
            id: 1,
            priority: 1,
            active,
            acknowledged,
            text: "Tank low level".to_owned(),
        }
    }

    #[test]
    fn alarm_beats_dispensing() {
        let telemetry = StationTelemetry {
            deliveries: vec![delivery(12.0)],
            alarms: vec![alarm(true, false)],
        };
        assert_eq!(derive_status(&telemetry), StationStatus::Alarm);
    }

    #[test]
    fn acknowledged_alarm_does_not_count() {
        let telemetry = StationTelemetry {
            deliveries: vec![delivery(12.0)],
            alarms: vec![alarm(true, true)],
        };
        assert_eq!(derive_status(&telemetry), StationStatus::Dispensing);
    }

    #[test]
    fn active_delivery_means_dispensing() {
        let telemetry = StationTelemetry {
            deliveries: vec![delivery(0.0), delivery(3.5)],
            alarms: vec![],
        };
        assert_eq!(derive_status(&telemetry), StationStatus::Dispensing);
    }

    #[test]
    fn quiet_station_is_idle() {
        let telemetry = StationTelemetry {
            deliveries: vec![delivery(0.0)],
            alarms: vec![alarm(false, false)],
        };
        assert_eq!(derive_status(&telemetry), StationStatus::Idle);
    }
}
