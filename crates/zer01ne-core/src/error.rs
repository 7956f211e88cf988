use thiserror::Error;

use crate::earth::ValidationResult;

/// Which registry entity a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Session,
    Pool,
    Bond,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Session => "Session",
            EntityKind::Pool => "Pool",
            EntityKind::Bond => "Bond",
        })
    }
}

/// Caller-facing failures of the bridge workflows. All are recoverable.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{kind} not found")]
    NotFound { kind: EntityKind, id: String },

    /// The location came back GAMMA at registration time.
    #[error("Location failed Earth validation")]
    ValidationFailed(Box<ValidationResult>),

    /// Periodic re-validation during a safety check came back unverified.
    #[error("Earth validation lost - reanchor required")]
    EarthValidationLost,
}

impl BridgeError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        BridgeError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
