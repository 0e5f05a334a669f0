//! Error types for building and checking configurations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`ConfigurationBuilder`](super::ConfigurationBuilder).
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No local path was given.
    #[error("Configuration requires a local path")]
    EmptyPath,

    /// A partition was given without a user to sync it as.
    #[error("Partition '{partition}' requires a user")]
    MissingUser {
        /// The partition descriptor that was supplied
        partition: String,
    },

    /// A user was given without a partition to sync.
    #[error("User '{user_id}' requires a partition")]
    MissingPartition {
        /// The id of the user that was supplied
        user_id: String,
    },

    /// The partition descriptor is empty after normalization.
    #[error("Partition descriptor must not be empty")]
    EmptyPartition,

    /// The user id is empty or whitespace.
    #[error("User id must not be empty")]
    EmptyUserId,

    /// Sync configurations can only be built for logged-in users.
    #[error("User '{user_id}' is not logged in ({state})")]
    UserNotLoggedIn {
        /// The id of the user
        user_id: String,
        /// The user's current state
        state: crate::user::UserState,
    },
}

impl ConfigError {
    /// Check if the error is about a missing half of the sync target.
    pub fn is_incomplete_sync_target(&self) -> bool {
        matches!(
            self,
            ConfigError::MissingUser { .. } | ConfigError::MissingPartition { .. }
        )
    }

    /// Check if the error is caused by the user's login state.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, ConfigError::UserNotLoggedIn { .. })
    }
}

/// Raised when a configuration without sync capability is used for sync.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The configuration has no remote partition and user.
    #[error("Configuration for '{}' is not sync-enabled", path.display())]
    NotSyncEnabled {
        /// Local path of the offending configuration
        path: PathBuf,
    },
}

impl CapabilityError {
    pub fn is_not_sync_enabled(&self) -> bool {
        matches!(self, CapabilityError::NotSyncEnabled { .. })
    }
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

impl From<CapabilityError> for crate::Error {
    fn from(err: CapabilityError) -> Self {
        crate::Error::Capability(err)
    }
}
