#![allow(clippy::unwrap_used)]
// Integration tests for `ControllerTransport` + `PtsClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use forecourt_pts::{
    AuthorizeKind, ControllerEndpoint, ControllerTransport, EndpointGates, Error, PtsClient,
    Scheme, TransportConfig,
};

const CHALLENGE: &str = "Digest realm=\"pts2\", nonce=\"deadbeef\", qop=\"auth\"";

// ── Helpers ─────────────────────────────────────────────────────────

/// Matches requests that carry no Authorization header (the digest probe).
struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// Matches requests that carry an Authorization header.
struct WithAuthHeader;

impl Match for WithAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        request.headers.contains_key("authorization")
    }
}

fn endpoint_for(server: &MockServer) -> ControllerEndpoint {
    let uri = url::Url::parse(&server.uri()).unwrap();
    ControllerEndpoint {
        host: uri.host_str().unwrap().to_owned(),
        port: uri.port().unwrap(),
        scheme: Scheme::Http,
        login: "admin".to_owned(),
        password: SecretString::from("pts-password".to_owned()),
    }
}

fn fast_config() -> TransportConfig {
    TransportConfig {
        timeout: Duration::from_millis(500),
        ..TransportConfig::default()
    }
}

fn empty_envelope() -> serde_json::Value {
    json!({ "Protocol": "jsonPTS", "Packets": [] })
}

/// Mount the handshake pair: 401 challenge for unauthenticated probes,
/// and a 200 for the authenticated empty-envelope confirmation.
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

async fn open_client(server: &MockServer) -> PtsClient {
    let transport = ControllerTransport::open(&endpoint_for(server), &fast_config(), &EndpointGates::new())
        .await
        .unwrap();
    PtsClient::new(transport)
}

fn tanks_response(packet_id: u32) -> serde_json::Value {
    json!({
        "Protocol": "jsonPTS",
        "Packets": [{
            "Id": packet_id,
            "Type": "GetTanks",
            "Result": "Success",
            "Data": {
                "Tanks": [
                    { "Tank": 1, "Product": 1, "Volume": 4200.5, "TCVolume": 4195.0,
                      "Ullage": 800.0, "Height": 1320.0, "Water": 2.0, "Temp": 29.4 },
                    { "Tank": 2, "Product": 3, "Volume": 1500.0, "TCVolume": 1498.2,
                      "Ullage": 3500.0, "Height": 610.0, "Water": 0.0, "Temp": 28.8 }
                ]
            }
        }]
    })
}

// ── Handshake tests ─────────────────────────────────────────────────

#[tokio::test]
async fn open_fails_without_digest_challenge() {
    let server = MockServer::start().await;

    // Controller that does not ask for digest auth at all.
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .mount(&server)
        .await;

    let result =
        ControllerTransport::open(&endpoint_for(&server), &fast_config(), &EndpointGates::new())
            .await;

    assert!(
        matches!(result, Err(Error::AuthChallengeMissing { .. })),
        "expected AuthChallengeMissing, got: {result:?}"
    );
}

#[tokio::test]
async fn open_fails_when_confirmation_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(WithAuthHeader)
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result =
        ControllerTransport::open(&endpoint_for(&server), &fast_config(), &EndpointGates::new())
            .await;

    assert!(
        matches!(result, Err(Error::Connect { .. })),
        "expected Connect, got: {result:?}"
    );
}

#[tokio::test]
async fn send_recovers_from_stale_nonce() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    // First authenticated GetTanks is rejected with a fresh challenge;
    // the transport must re-handshake and resend.
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(WithAuthHeader)
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(WithAuthHeader)
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tanks_response(1)))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let tanks = client.tanks().await.unwrap();
    assert_eq!(tanks.len(), 2);
}

// ── Typed operation tests ───────────────────────────────────────────

#[tokio::test]
async fn tanks_returns_typed_entries() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tanks_response(1)))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let tanks = client.tanks().await.unwrap();

    assert_eq!(tanks.len(), 2);
    assert_eq!(tanks[0].tank, 1);
    assert_eq!(tanks[0].product, 1);
    assert!((tanks[0].volume - 4200.5).abs() < f64::EPSILON);
    assert!((tanks[1].ullage - 3500.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn repeated_tank_reads_are_identical() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    // Packet ids advance per request; each canned response echoes its id.
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Id": 1, "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tanks_response(1)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Id": 2, "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tanks_response(2)))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let first = client.tanks().await.unwrap();
    let second = client.tanks().await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn deliveries_and_alarms_unwrap_payloads() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetDeliveries" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 1,
                "Type": "GetDeliveries",
                "Result": "Success",
                "Data": { "Deliveries": [
                    { "Hose": 1, "Product": 1, "Volume": 12.34, "Amount": 25.30, "Price": 2.05 }
                ]}
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetAlarms" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 2,
                "Type": "GetAlarms",
                "Result": "Success",
                "Data": { "Alarms": [
                    { "Id": 7, "Priority": 1, "Active": true, "Acknowledged": false,
                      "Text": "Tank 2 low level" }
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let client = open_client(&server).await;

    let deliveries = client.deliveries().await.unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].hose, 1);
    assert!(deliveries[0].volume > 0.0);

    let alarms = client.alarms().await.unwrap();
    assert_eq!(alarms.len(), 1);
    assert!(alarms[0].active);
    assert!(!alarms[0].acknowledged);
    assert_eq!(alarms[0].text, "Tank 2 low level");
}

#[tokio::test]
async fn authorize_sends_vendor_exact_payload() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Type": "Authorize",
                "Data": { "Hose": 2, "Type": "Volume", "Value": 10.0 }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{ "Id": 1, "Type": "Authorize", "Result": "Success" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    client
        .authorize_hose(2, AuthorizeKind::Volume, 10.0)
        .await
        .unwrap();
}

// ── Failure surface tests ───────────────────────────────────────────

#[tokio::test]
async fn failing_packet_surfaces_protocol_error() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "Authorize" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{
                "Id": 1,
                "Type": "Authorize",
                "Result": "Fail",
                "ErrorMessage": "Hose 2 is already authorized"
            }]
        })))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client
        .authorize_hose(2, AuthorizeKind::Amount, 50.0)
        .await
        .unwrap_err();

    match err {
        Error::Protocol { packet_id, message } => {
            assert_eq!(packet_id, 1);
            assert_eq!(message, "Hose 2 is already authorized");
        }
        other => panic!("expected Protocol error, got: {other:?}"),
    }
}

#[tokio::test]
async fn mismatched_packet_id_is_rejected() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetDateTime" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Protocol": "jsonPTS",
            "Packets": [{ "Id": 99, "Type": "GetDateTime", "Result": "Success",
                          "Data": { "Date": "2026-08-26", "Time": "10:15:00" } }]
        })))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client.date_time().await.unwrap_err();

    assert!(
        matches!(err, Error::Deserialization { .. }),
        "expected Deserialization, got: {err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_controller_times_out() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tanks_response(1))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client.tanks().await.unwrap_err();

    // The cancellation deadline sits below the reqwest client bound, so
    // a slow controller always surfaces as Timeout, never Transport.
    assert!(
        matches!(err, Error::Timeout { .. }),
        "expected Timeout, got: {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test(flavor = "multi_thread")]
async fn read_retries_once_after_transport_failure() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    // First GetTanks stalls past the deadline; after the fresh
    // handshake the retried read must land on the healthy response.
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tanks_response(1))
                .set_delay(Duration::from_secs(5)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Id": 2, "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tanks_response(2)))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let tanks = client.tanks().await.unwrap();
    assert_eq!(tanks.len(), 2);
}

#[tokio::test]
async fn stale_nonce_control_is_not_resent() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    // A controller that 401s a Stop mid-session: the command must not
    // be re-posted, only the handshake repair runs.
    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(WithAuthHeader)
        .and(body_partial_json(json!({ "Packets": [{ "Type": "Stop" }] })))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client.stop_delivery(1).await.unwrap_err();

    assert!(
        matches!(err, Error::Http { status: 401 }),
        "expected Http 401, got: {err:?}"
    );
}

#[tokio::test]
async fn server_error_surfaces_http_status() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client.tanks().await.unwrap_err();

    assert!(
        matches!(err, Error::Http { status: 503 }),
        "expected Http 503, got: {err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_request_fails_fast_as_busy() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("POST"))
        .and(path("/jsonPTS"))
        .and(body_partial_json(json!({ "Packets": [{ "Type": "GetTanks" }] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tanks_response(1))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = Arc::new(open_client(&server).await);

    let background = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.tanks().await })
    };

    // Give the background read time to take the gate.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let envelope = forecourt_pts::pts::wire::RequestEnvelope::empty();
    let err = client.transport().try_send(&envelope).await.unwrap_err();
    assert!(
        matches!(err, Error::ControllerBusy),
        "expected ControllerBusy, got: {err:?}"
    );

    background.await.unwrap().unwrap();
}
