#![allow(clippy::unwrap_used)]
// Integration tests for `StatusResolver` against a mocked controller and
// an in-memory store.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use forecourt_core::model::{
    PricingRow, StationConfigRow, StationRecord, StationStatus, TankRow,
};
use forecourt_core::{MemoryStore, StatusResolver};
use forecourt_pts::{ControllerEndpoint, Product, Scheme, TransportConfig};

const STATION: &str = "st-001";
const CHALLENGE: &str = "Digest realm=\"pts2\", nonce=\"deadbeef\", qop=\"auth\"";

// ── Helpers ─────────────────────────────────────────────────────────

struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

struct WithAuthHeader;

impl Match for WithAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        request.headers.contains_key("authorization")
    }
}

fn empty_envelope() -> serde_json::Value {
    json!({ "Protocol": "jsonPTS", "Packets": [] })
}

async fn mount_handshake(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(WithAuthHeader)
        .and(body_json(empty_envelope()))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .mount(server)
        .await;
}

/// Mount GetDeliveries/GetAlarms responses; packet ids echo the request
/// order within one session (deliveries first, alarms second).
async fn mount_telemetry(
    server: &MockServer,
    deliveries: serde_json::Value,
    alarms: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetDeliveries" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 1, "Type": "GetDeliveries", "Result": "Success",
                "Data": { "Deliveries": deliveries }
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetAlarms" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 2, "Type": "GetAlarms", "Result": "Success",
                "Data": { "Alarms": alarms }
            }]
        })))
        .mount(server)
        .await;
}

fn endpoint_for(server: &MockServer) -> ControllerEndpoint {
    let address = server.address();
    ControllerEndpoint {
        host: address.ip().to_string(),
        port: address.port(),
        scheme: Scheme::Http,
        login: "admin".to_owned(),
        password: SecretString::from("pts-password".to_owned()),
    }
}

fn record(status: StationStatus) -> StationRecord {
    StationRecord {
        id: STATION.to_owned(),
        name: "Jalan Ampang".to_owned(),
        address: "Kuala Lumpur".to_owned(),
        status,
        last_heartbeat: None,
    }
}

fn seeded_store(status: StationStatus) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_record(record(status));
    store
}

fn resolver(store: MemoryStore) -> StatusResolver<MemoryStore> {
    let config = TransportConfig {
        timeout: Duration::from_millis(500),
        ..TransportConfig::default()
    };
    StatusResolver::new(store, config)
}

fn active_delivery() -> serde_json::Value {
    json!([{ "Hose": 1, "Product": 1, "Volume": 12.3, "Amount": 25.22, "Price": 2.05 }])
}

fn unacknowledged_alarm() -> serde_json::Value {
    json!([{ "Id": 7, "Priority": 1, "Active": true, "Acknowledged": false,
             "Text": "Tank 2 low level" }])
}

// ── Status precedence ───────────────────────────────────────────────

#[tokio::test]
async fn unacknowledged_alarm_wins_over_dispensing() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_telemetry(&server, active_delivery(), unacknowledged_alarm()).await;

    let store = seeded_store(StationStatus::Idle);
    store.insert_endpoint(STATION, endpoint_for(&server));
    let resolver = resolver(store);

    let resolved = resolver.resolve(STATION).await.unwrap();
    assert_eq!(resolved.status, StationStatus::Alarm);
    assert!(resolved.controller_reachable);
    assert!(resolved.telemetry.is_some());
}

#[tokio::test]
async fn active_delivery_means_dispensing() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_telemetry(&server, active_delivery(), json!([])).await;

    let store = seeded_store(StationStatus::Idle);
    store.insert_endpoint(STATION, endpoint_for(&server));
    let resolver = resolver(store);

    let resolved = resolver.resolve(STATION).await.unwrap();
    assert_eq!(resolved.status, StationStatus::Dispensing);
}

#[tokio::test]
async fn quiet_controller_resolves_idle_and_writes_heartbeat() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_telemetry(&server, json!([]), json!([])).await;

    let store = seeded_store(StationStatus::Alarm);
    store.insert_endpoint(STATION, endpoint_for(&server));
    let resolver = resolver(store);

    let resolved = resolver.resolve(STATION).await.unwrap();
    assert_eq!(resolved.status, StationStatus::Idle);
    assert!(resolved.last_heartbeat.is_some());

    let saved = resolver.store().saved_statuses();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, STATION);
    assert_eq!(saved[0].1, StationStatus::Idle);
}

// ── Fallback ────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_controller_falls_back_to_persisted_status() {
    // Start a server only to claim a port, then shut it down.
    let dead_endpoint = {
        let server = MockServer::start().await;
        endpoint_for(&server)
    };

    let store = seeded_store(StationStatus::Dispensing);
    store.insert_endpoint(STATION, dead_endpoint);
    let resolver = resolver(store);

    let resolved = resolver.resolve(STATION).await.unwrap();
    assert_eq!(resolved.status, StationStatus::Dispensing);
    assert!(!resolved.controller_reachable);
    assert!(resolved.telemetry.is_none());
    assert!(resolver.store().saved_statuses().is_empty());
}

#[tokio::test]
async fn station_without_controller_uses_persisted_status() {
    let resolver = resolver(seeded_store(StationStatus::Idle));

    let resolved = resolver.resolve(STATION).await.unwrap();
    assert_eq!(resolved.status, StationStatus::Idle);
    assert!(!resolved.controller_reachable);
}

#[tokio::test]
async fn maintenance_mode_skips_the_controller() {
    let server = MockServer::start().await;
    // No mocks mounted: any probe would fail loudly, but none may happen.

    let store = seeded_store(StationStatus::Idle);
    store.insert_endpoint(STATION, endpoint_for(&server));
    store.insert_config(
        STATION,
        StationConfigRow {
            max_dispense_volume: 100.0,
            max_dispense_amount: 500.0,
            maintenance_mode: true,
        },
    );
    let resolver = resolver(store);

    let resolved = resolver.resolve(STATION).await.unwrap();
    assert_eq!(resolved.status, StationStatus::Maintenance);
    assert!(!resolved.controller_reachable);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_station_is_a_hard_error() {
    let resolver = resolver(MemoryStore::new());
    let result = resolver.resolve("no-such-station").await;
    assert!(result.is_err());
}

// ── Tank report ─────────────────────────────────────────────────────

fn persisted_tank_rows() -> Vec<TankRow> {
    vec![TankRow {
        tank: 1,
        product: Product::Ron95,
        level_litres: 3000.0,
        capacity_litres: 5000.0,
        temperature_c: 29.0,
        low_level_alarm: false,
        high_level_alarm: false,
    }]
}

#[tokio::test]
async fn live_tank_probe_applies_alarm_thresholds() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 1, "Type": "GetTanks", "Result": "Success",
                "Data": { "Tanks": [
                    { "Tank": 1, "Product": 1, "Volume": 800.0, "TCVolume": 798.5,
                      "Ullage": 4200.0, "Height": 400.0, "Water": 0.0, "Temp": 29.4 },
                    { "Tank": 2, "Product": 3, "Volume": 4600.0, "TCVolume": 4597.0,
                      "Ullage": 400.0, "Height": 1500.0, "Water": 1.0, "Temp": 28.8 }
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let store = seeded_store(StationStatus::Idle);
    store.insert_endpoint(STATION, endpoint_for(&server));
    store.insert_tanks(STATION, persisted_tank_rows());
    let resolver = resolver(store);

    let report = resolver.tank_report(STATION).await.unwrap();
    assert!(report.live);
    assert_eq!(report.tanks.len(), 2);

    assert!(report.tanks[0].low_level_alarm, "800 L is under the low threshold");
    assert!(!report.tanks[0].high_level_alarm);
    assert!((report.tanks[0].capacity_litres - 5000.0).abs() < f64::EPSILON);

    assert!(report.tanks[1].high_level_alarm, "400 L ullage is under the high threshold");
    assert!(!report.tanks[1].low_level_alarm);
}

#[tokio::test]
async fn failed_tank_probe_falls_back_to_persisted_rows() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 1, "Type": "GetTanks", "Result": "Fail",
                "ErrorMessage": "Probe offline"
            }]
        })))
        .mount(&server)
        .await;

    let store = seeded_store(StationStatus::Idle);
    store.insert_endpoint(STATION, endpoint_for(&server));
    store.insert_tanks(STATION, persisted_tank_rows());
    let resolver = resolver(store);

    let report = resolver.tank_report(STATION).await.unwrap();
    assert!(!report.live);
    assert_eq!(report.tanks.len(), 1);
    assert_eq!(report.tanks[0].product, Product::Ron95);
    assert!((report.tanks[0].level_litres - 3000.0).abs() < f64::EPSILON);
}

// ── Station detail ──────────────────────────────────────────────────

#[tokio::test]
async fn detail_falls_back_per_subsystem() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_telemetry(&server, json!([]), json!([])).await;

    // Deliveries and alarms answer, GetTanks fails: live status with
    // persisted tank rows.
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 1, "Type": "GetTanks", "Result": "Fail",
                "ErrorMessage": "Probe offline"
            }]
        })))
        .mount(&server)
        .await;

    let store = seeded_store(StationStatus::Idle);
    store.insert_endpoint(STATION, endpoint_for(&server));
    store.insert_tanks(STATION, persisted_tank_rows());
    store.insert_pricing(
        STATION,
        vec![PricingRow {
            product: Product::Ron95,
            unit_price: 2.05,
            currency: "MYR".to_owned(),
        }],
    );
    let resolver = resolver(store);

    let detail = resolver.station_detail(STATION).await.unwrap();
    assert_eq!(detail.name, "Jalan Ampang");
    assert!(detail.resolved.controller_reachable);
    assert_eq!(detail.resolved.status, StationStatus::Idle);
    assert!(!detail.tanks.live);
    assert_eq!(detail.tanks.tanks.len(), 1);
    assert_eq!(detail.pricing.len(), 1);
    assert!((detail.pricing[0].unit_price - 2.05).abs() < f64::EPSILON);
}
