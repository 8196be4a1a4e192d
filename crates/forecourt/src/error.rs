//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and device errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use forecourt_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const BUSY: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to controller at {endpoint}")]
    #[diagnostic(
        code(forecourt::connection_failed),
        help(
            "Check that the controller is powered and reachable.\n\
             Endpoint: {endpoint}\n\
             Try: forecourt datetime -v"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Controller did not offer Digest authentication")]
    #[diagnostic(
        code(forecourt::no_digest_challenge),
        help(
            "The endpoint answered, but not like a PTS-2 controller.\n\
             Verify host, port, and scheme in your profile."
        )
    )]
    NoDigestChallenge { message: String },

    #[error("Authentication failed for login '{login}'")]
    #[diagnostic(
        code(forecourt::auth_failed),
        help(
            "Verify the controller login and password.\n\
             Set FORECOURT_PASSWORD or the profile's password field."
        )
    )]
    AuthFailed { login: String },

    #[error("Controller is busy with another request")]
    #[diagnostic(
        code(forecourt::busy),
        help("PTS-2 controllers handle one request at a time. Retry shortly.")
    )]
    Busy,

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(forecourt::timeout),
        help("Increase timeout with --timeout or check controller responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Device ───────────────────────────────────────────────────────

    #[error("Controller rejected the command: {message}")]
    #[diagnostic(code(forecourt::rejected))]
    CommandRejected { message: String },

    #[error("Controller sent a malformed response")]
    #[diagnostic(
        code(forecourt::malformed),
        help("Run with -vv to log the raw response body.")
    )]
    MalformedResponse { message: String },

    // ── Refill / business rules ──────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(forecourt::refill_rejected))]
    RefillRejected { message: String },

    // ── Stations ─────────────────────────────────────────────────────

    #[error("Station '{station_id}' not found")]
    #[diagnostic(
        code(forecourt::station_not_found),
        help("Check the station_id in your profile.")
    )]
    StationNotFound { station_id: String },

    #[error("Station '{station_id}' has no controller configured")]
    #[diagnostic(
        code(forecourt::no_controller),
        help("Set host and port in the profile, or pass --host/--port.")
    )]
    NoController { station_id: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(forecourt::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(forecourt::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(forecourt::no_config),
        help(
            "Pass --host/--port/--login/--password, or create a profile.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(forecourt::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(forecourt::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    ConfirmationRequired { action: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NoDigestChallenge { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Busy => exit_code::BUSY,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::StationNotFound { .. } | Self::NoController { .. } => exit_code::NOT_FOUND,
            Self::CommandRejected { .. } | Self::RefillRejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } | Self::ConfirmationRequired { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Store(store) => match store {
                forecourt_core::StoreError::StationNotFound(station_id) => {
                    Self::StationNotFound { station_id }
                }
                other => Self::Validation {
                    field: "store".into(),
                    reason: other.to_string(),
                },
            },

            CoreError::NoController(station_id) => Self::NoController { station_id },

            CoreError::Device(device) => Self::from_device("controller", "login", device),

            CoreError::Rejected(rejected) => Self::RefillRejected {
                message: rejected.to_string(),
            },
        }
    }
}

impl CliError {
    /// Map a raw device error, threading in the endpoint/login context
    /// the device layer does not carry.
    pub fn from_device(endpoint: &str, login: &str, err: forecourt_pts::Error) -> Self {
        use forecourt_pts::Error;

        match err {
            Error::AuthChallengeMissing { message } => Self::NoDigestChallenge { message },
            // A handshake that got far enough to be refused is an auth
            // problem, not a network one.
            Error::Connect { ref message } if message.contains("401") => Self::AuthFailed {
                login: login.to_owned(),
            },
            // Established session, credential no longer accepted.
            Error::Http { status: 401 } => Self::AuthFailed {
                login: login.to_owned(),
            },
            Error::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            Error::ControllerBusy => Self::Busy,
            Error::Protocol { message, .. } => Self::CommandRejected { message },
            Error::Deserialization { message, .. } => Self::MalformedResponse { message },
            other => Self::ConnectionFailed {
                endpoint: endpoint.to_owned(),
                source: other.into(),
            },
        }
    }
}
