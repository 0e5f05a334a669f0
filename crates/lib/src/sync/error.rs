//! Error types for the synchronization module.

use thiserror::Error;

use crate::config::{CapabilityError, ConfigurationIdentity};

/// Errors returned by the session registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The configuration is not sync-enabled. Not retryable.
    #[error(transparent)]
    NotSyncEnabled(#[from] CapabilityError),

    /// The sync service could not materialize a session.
    #[error("Failed to materialize session for {identity}: {source}")]
    MaterializationFailed {
        identity: ConfigurationIdentity,
        #[source]
        source: SyncServiceError,
    },

    /// The registry was shut down.
    #[error("Session registry is closed")]
    RegistryClosed,
}

impl SessionError {
    /// Check if this is a usage error: sync requested on a non-sync configuration.
    pub fn is_not_sync_enabled(&self) -> bool {
        matches!(self, SessionError::NotSyncEnabled(_))
    }

    /// Check if the sync service failed to create the session.
    pub fn is_materialization_error(&self) -> bool {
        matches!(self, SessionError::MaterializationFailed { .. })
    }

    /// Check if the same call may succeed later.
    ///
    /// Only service failures that the service itself marks transient qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::MaterializationFailed { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionError::RegistryClosed)
    }
}

/// Errors reported by a [`SyncService`](super::SyncService) implementation.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SyncServiceError {
    /// The backend is temporarily unavailable.
    #[error("Sync backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the session.
    #[error("Session rejected: {0}")]
    Rejected(String),

    /// Materialization was cancelled before completing.
    #[error("Materialization cancelled")]
    Cancelled,

    /// A state transition not allowed by the session state machine.
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: super::SessionState,
        to: super::SessionState,
    },
}

impl SyncServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncServiceError::Unavailable(_) | SyncServiceError::Cancelled
        )
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
