use thiserror::Error;

use crate::refill::RefillRejected;
use crate::store::StoreError;

/// Top-level error type for `forecourt-core`.
///
/// Read paths (status, tanks) never carry `Device`: controller
/// unreachability there is modeled as data (`controller_reachable =
/// false`), not as an error. Control paths (authorize, stop) propagate
/// `Device` hard — there is no safe fallback for a command whose effect
/// on physical equipment is unknown.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A control operation was requested for a station with no
    /// controller endpoint configured.
    #[error("station '{0}' has no controller configured")]
    NoController(String),

    /// Device failure on a control path.
    #[error("controller error: {0}")]
    Device(#[from] forecourt_pts::Error),

    /// Business-rule violation on a refill request; carries an
    /// actionable reason for the user.
    #[error(transparent)]
    Rejected(#[from] RefillRejected),
}
