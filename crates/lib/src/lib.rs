//!
//! Session Registry: one sync session per remote target.
//!
//! This library ties locally opened databases to remote synchronization
//! sessions. It guarantees that every database opened for the same remote
//! target shares one session, and that databases without a sync target can
//! never obtain one.
//!
//! ## Core Concepts
//!
//! * **Configurations (`config::Configuration`)**: Immutable descriptions of a local database and its optional sync target (user + partition). Built and validated by `config::ConfigurationBuilder`.
//! * **Identities (`config::ConfigurationIdentity`)**: The canonical `(user, partition)` key of a configuration. Configurations that differ only in local settings share an identity.
//! * **Capabilities (`config::SyncCapability`)**: Proof, created at build time, that a configuration may sync.
//! * **Registry (`sync::SessionRegistry`)**: Maps identities to sessions, creating each one exactly once and evicting it after a grace period once unused.
//! * **Sessions (`sync::Session`)**: The shared sync channel for one identity; callers hold counted `sync::SessionHandle`s.
//! * **Sync services (`sync::SyncService`)**: The pluggable authority that materializes and disposes the remote side of a session.
//! * **Databases (`database::Database`)**: Local database instances that acquire a session on open and release it on close.

pub mod config;
pub mod database;
pub mod sync;
pub mod user;

pub use config::{Configuration, ConfigurationBuilder, ConfigurationIdentity, SyncCapability};
pub use database::Database;
pub use sync::{Session, SessionHandle, SessionRegistry};
pub use user::{User, UserState};

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),

    /// Sync capability errors from the config module
    #[error(transparent)]
    Capability(config::CapabilityError),

    /// Structured session errors from the sync module
    #[error(transparent)]
    Session(sync::SessionError),

    /// Structured database errors from the database module
    #[error(transparent)]
    Database(database::DatabaseError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::Capability(_) => "config",
            Error::Session(_) => "sync",
            Error::Database(_) => "database",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if sync was requested for a configuration that has no sync target.
    pub fn is_not_sync_enabled(&self) -> bool {
        match self {
            Error::Capability(err) => err.is_not_sync_enabled(),
            Error::Session(err) => err.is_not_sync_enabled(),
            _ => false,
        }
    }

    /// Check if this error is a configuration mistake by the caller.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Config(_)) || self.is_not_sync_enabled()
    }

    /// Check if the sync service failed to create a session.
    pub fn is_materialization_error(&self) -> bool {
        match self {
            Error::Session(err) => err.is_materialization_error(),
            _ => false,
        }
    }

    /// Check if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Session(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Check if the database or registry involved was closed.
    pub fn is_closed(&self) -> bool {
        match self {
            Error::Session(err) => err.is_closed(),
            Error::Database(err) => err.is_closed(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Config(err) => err.is_authentication_error(),
            _ => false,
        }
    }
}
