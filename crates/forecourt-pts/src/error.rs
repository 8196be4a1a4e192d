use thiserror::Error;

/// Top-level error type for the `forecourt-pts` crate.
///
/// Covers every failure mode across the device path: Digest handshake,
/// session establishment, transport, and device-reported protocol errors.
/// `forecourt-core` decides which of these are recoverable (read paths
/// fall back to persisted data) and which must propagate (control paths).
#[derive(Debug, Error)]
pub enum Error {
    // ── Handshake ───────────────────────────────────────────────────
    /// The unauthenticated probe did not return 401, or the
    /// `WWW-Authenticate` header was absent or unparseable.
    #[error("Digest challenge missing: {message}")]
    AuthChallengeMissing { message: String },

    /// Network-level failure during the handshake probe.
    #[error("Handshake transport error: {0}")]
    AuthTransport(reqwest::Error),

    // ── Session ─────────────────────────────────────────────────────
    /// The credential confirmation request was rejected by the controller.
    #[error("Controller connect failed: {message}")]
    Connect { message: String },

    /// Request exceeded the bounded timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Another request is in flight against the same controller and
    /// fail-fast was requested instead of queueing.
    #[error("Controller busy: another request is in flight")]
    ControllerBusy,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error on an authenticated request.
    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx HTTP status on an established session.
    #[error("controller returned HTTP {status}")]
    Http { status: u16 },

    // ── Protocol ────────────────────────────────────────────────────
    /// The controller reported `Result: "Fail"` on a packet. Carries the
    /// failing packet's id and error text.
    #[error("PTS protocol error (packet {packet_id}): {message}")]
    Protocol { packet_id: u32, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body did not parse as a jsonPTS envelope, with the raw
    /// body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transport-level failure that an
    /// idempotent read may retry once with a fresh handshake.
    ///
    /// Device-reported protocol failures are never transient: the
    /// controller answered, it just said no.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) | Self::AuthTransport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this failure happened before a usable credential
    /// existed (handshake-level).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthChallengeMissing { .. } | Self::AuthTransport(_)
        )
    }
}
