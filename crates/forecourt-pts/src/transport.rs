// Controller transport
//
// Owns one controller's base address and credential. Issues framed jsonPTS
// requests over HTTP with Digest authorization, a hard per-request timeout,
// and single-flight semantics per endpoint: PTS-2 units are embedded
// devices that do not reliably handle concurrent sessions, so every
// request against the same controller goes through a mutual-exclusion
// gate. Distinct controllers are fully independent.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use secrecy::SecretString;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use url::Url;

use crate::digest::{DigestAlgorithm, DigestCredential, DigestSession};
use crate::error::Error;
use crate::pts::wire::{RequestEnvelope, ResponseEnvelope};

/// Fixed request path on the controller.
pub const JSON_PTS_PATH: &str = "/jsonPTS";

/// URL scheme for a controller endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Identifies one physical controller. Immutable once loaded for a
/// session; the caller reloads it from configuration storage on each
/// connect attempt.
#[derive(Debug, Clone)]
pub struct ControllerEndpoint {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    pub login: String,
    pub password: SecretString,
}

impl ControllerEndpoint {
    /// Controller root URL, e.g. `http://192.168.1.100:8080`.
    pub fn base_url(&self) -> Result<Url, Error> {
        Url::parse(&format!(
            "{}://{}:{}",
            self.scheme.as_str(),
            self.host,
            self.port
        ))
        .map_err(Error::InvalidUrl)
    }

    /// Identity key for the single-flight gate registry. Two endpoints
    /// with the same host and port are the same physical device.
    pub fn gate_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Transport tuning shared by all sessions of one gateway instance.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hard upper bound per request, enforced via cancellation.
    pub timeout: Duration,
    /// Accept self-signed certificates (controllers ship with them).
    pub accept_invalid_certs: bool,
    pub digest_algorithm: DigestAlgorithm,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            accept_invalid_certs: true,
            digest_algorithm: DigestAlgorithm::default(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        // The per-request deadline is enforced by cancellation in
        // `post_raw`; the client-level bound sits above it as a backstop
        // so slow controllers surface as `Error::Timeout`, not as a
        // reqwest transport error.
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout + Duration::from_secs(1))
            .user_agent("forecourt/0.1.0");

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(Error::Transport)
    }
}

/// Per-endpoint mutual-exclusion gates, scoped to one gateway instance.
///
/// Passed into [`ControllerTransport::open`] rather than living in
/// process-wide state; callers that want cross-request serialization
/// share one registry.
#[derive(Debug, Clone, Default)]
pub struct EndpointGates {
    gates: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl EndpointGates {
    pub fn new() -> Self {
        Self::default()
    }

    fn gate(&self, key: &str) -> Arc<Mutex<()>> {
        self.gates
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// An authenticated session with one PTS-2 controller.
#[derive(Debug)]
pub struct ControllerTransport {
    http: reqwest::Client,
    url: Url,
    session: DigestSession,
    credential: std::sync::Mutex<DigestCredential>,
    gate: Arc<Mutex<()>>,
    timeout: Duration,
}

impl ControllerTransport {
    /// Open a session: Digest handshake, then one authenticated
    /// empty-packets request to confirm the controller accepts the
    /// credential. Any non-2xx confirmation fails with [`Error::Connect`].
    pub async fn open(
        endpoint: &ControllerEndpoint,
        config: &TransportConfig,
        gates: &EndpointGates,
    ) -> Result<Self, Error> {
        let http = config.build_client()?;
        let url = endpoint.base_url()?.join(JSON_PTS_PATH)?;
        let gate = gates.gate(&endpoint.gate_key());

        let session = DigestSession::new(endpoint.login.clone(), endpoint.password.clone())
            .with_algorithm(config.digest_algorithm);

        // The handshake itself is a device conversation; serialize it too.
        let _guard = gate.clone().lock_owned().await;

        let credential = session
            .authenticate(&http, &url, "POST", JSON_PTS_PATH)
            .await?;

        let transport = Self {
            http,
            url,
            session,
            credential: std::sync::Mutex::new(credential),
            gate: gate.clone(),
            timeout: config.timeout,
        };

        // Credential confirmation: an empty envelope has no device-side
        // effect but exercises the full authorized round trip.
        let resp = transport.post_raw(&RequestEnvelope::empty()).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Connect {
                message: format!("credential confirmation rejected with HTTP {status}"),
            });
        }

        debug!(url = %transport.url, "controller session open");
        drop(_guard);
        Ok(transport)
    }

    /// Send a read envelope, holding the endpoint gate for the duration.
    ///
    /// Blocks until the gate is free. A mid-session 401 (the controller
    /// discarded our nonce) triggers one re-handshake and a resend of
    /// the same envelope; only idempotent reads may go through here.
    /// HTTP success with a failing packet inside the envelope is
    /// reported as [`Error::Protocol`] naming the first failing packet —
    /// callers needing partial results must issue single-packet requests.
    pub async fn send(&self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope, Error> {
        let _guard = self.gate.clone().lock_owned().await;
        self.send_gated(envelope, _guard, true).await
    }

    /// Send a control envelope. Never resent: the vendor documentation
    /// does not promise that a 401-rejected command is side-effect free,
    /// so a mid-session 401 re-handshakes to repair the session and then
    /// surfaces as [`Error::Http`] for the caller to decide.
    pub async fn send_control(&self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope, Error> {
        let _guard = self.gate.clone().lock_owned().await;
        self.send_gated(envelope, _guard, false).await
    }

    /// Like [`send_control`](Self::send_control), but fails fast with
    /// [`Error::ControllerBusy`] when another request holds the gate.
    pub async fn try_send(&self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope, Error> {
        let guard = self
            .gate
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::ControllerBusy)?;
        self.send_gated(envelope, guard, false).await
    }

    async fn send_gated(
        &self,
        envelope: &RequestEnvelope,
        _guard: OwnedMutexGuard<()>,
        resend_stale_nonce: bool,
    ) -> Result<ResponseEnvelope, Error> {
        let resp = self.post_raw(envelope).await?;

        // A fresh 401 means the controller discarded our nonce. Repair
        // the session either way; resend only when the caller declared
        // the envelope idempotent.
        let resp = if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!("credential rejected mid-session, re-handshaking");
            let fresh = self
                .session
                .authenticate(&self.http, &self.url, "POST", JSON_PTS_PATH)
                .await?;
            *self.credential.lock().expect("credential lock poisoned") = fresh;
            if !resend_stale_nonce {
                return Err(Error::Http { status: 401 });
            }
            self.post_raw(envelope).await?
        } else {
            resp
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let parsed: ResponseEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        // Surface the first failing packet. Partial success is still a
        // protocol error at this layer.
        if let Some(failed) = parsed.packets.iter().find(|p| p.is_failure()) {
            return Err(Error::Protocol {
                packet_id: failed.id,
                message: failed
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown controller error".to_owned()),
            });
        }

        Ok(parsed)
    }

    /// Re-run the Digest handshake, replacing the stored credential.
    ///
    /// Used by idempotent-read retry paths that want a clean session
    /// after a transport-level failure.
    pub async fn reauthenticate(&self) -> Result<(), Error> {
        let _guard = self.gate.clone().lock_owned().await;
        let fresh = self
            .session
            .authenticate(&self.http, &self.url, "POST", JSON_PTS_PATH)
            .await?;
        *self.credential.lock().expect("credential lock poisoned") = fresh;
        Ok(())
    }

    /// One authorized POST with the bounded timeout. Does not take the
    /// gate; callers do.
    async fn post_raw(&self, envelope: &RequestEnvelope) -> Result<reqwest::Response, Error> {
        let auth = self
            .credential
            .lock()
            .expect("credential lock poisoned")
            .next_header();

        debug!(url = %self.url, "POST jsonPTS");

        let fut = self
            .http
            .post(self.url.clone())
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(envelope)
            .send();

        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(Error::Transport)
    }
}
