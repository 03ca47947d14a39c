//! Shared error type across fleetmetrics crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Unified error type used by the registry and the gateway.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Same family name registered with a different kind or label schema.
    #[error("metric family {name} already registered with a different schema")]
    DuplicateName { name: String },
    /// Supplied labels do not match the family's label names exactly.
    #[error("invalid label set for {family}: {reason}")]
    InvalidLabelSet { family: String, reason: String },
    /// Observation type does not fit the family kind.
    #[error("observation does not fit {kind} family {family}")]
    KindMismatch { family: String, kind: &'static str },
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}
