//! Database configurations and their sync capability.
//!
//! A [`Configuration`] describes where a local database lives and,
//! optionally, which remote partition it syncs as which user. The sync
//! capability is decided once by [`ConfigurationBuilder::build`] and checked
//! again by [`Configuration::require_sync_capable`] before any session work.

use std::path::{Path, PathBuf};

use crate::user::User;

pub mod errors;
pub mod identity;

pub use errors::{CapabilityError, ConfigError};
pub use identity::{ConfigurationIdentity, SyncCapability};

/// Immutable description of a local database and its optional sync target.
///
/// Invariant: `capability` is `Some` iff both `user` and `partition` are.
#[derive(Debug, Clone)]
pub struct Configuration {
    path: PathBuf,
    user: Option<User>,
    partition: Option<String>,
    capability: Option<SyncCapability>,
}

impl Configuration {
    /// Start building a configuration for the given local path.
    pub fn builder(path: impl Into<PathBuf>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(path)
    }

    /// Shorthand for a plain, local-only configuration.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::builder(path).build()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The partition descriptor, as normalized at build time.
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.capability.is_some()
    }

    /// Canonical identity of this configuration's remote target.
    ///
    /// Never fails; local configurations yield an identity with no user and
    /// no partition.
    pub fn identity(&self) -> ConfigurationIdentity {
        match &self.capability {
            Some(capability) => capability.identity().clone(),
            None => ConfigurationIdentity::new(
                self.user.as_ref().map(User::id),
                self.partition.as_deref(),
            ),
        }
    }

    /// Check that this configuration may acquire a sync session.
    pub fn require_sync_capable(&self) -> Result<&SyncCapability, CapabilityError> {
        match (&self.capability, &self.user, &self.partition) {
            (Some(capability), Some(_), Some(_)) => Ok(capability),
            _ => Err(CapabilityError::NotSyncEnabled {
                path: self.path.clone(),
            }),
        }
    }
}

/// Derive the canonical identity of any configuration.
pub fn identity_of(config: &Configuration) -> ConfigurationIdentity {
    config.identity()
}

/// Check the sync capability of any configuration.
pub fn require_sync_capable(config: &Configuration) -> Result<&SyncCapability, CapabilityError> {
    config.require_sync_capable()
}

/// Builder for [`Configuration`].
///
/// ```
/// use session_registry::{Configuration, User};
///
/// let config = Configuration::builder("notes.db")
///     .sync(User::new("alice"), "/~/notes")
///     .build()
///     .unwrap();
/// assert!(config.is_sync_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    path: PathBuf,
    user: Option<User>,
    partition: Option<String>,
}

impl ConfigurationBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            user: None,
            partition: None,
        }
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Set both halves of the sync target at once.
    pub fn sync(self, user: User, partition: impl Into<String>) -> Self {
        self.user(user).partition(partition)
    }

    /// Validate the settings and produce an immutable configuration.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        let partition = self
            .partition
            .as_deref()
            .map(identity::normalize_partition);

        let capability = match (&self.user, &partition) {
            (None, None) => None,
            (None, Some(partition)) => {
                return Err(ConfigError::MissingUser {
                    partition: partition.clone(),
                });
            }
            (Some(user), None) => {
                return Err(ConfigError::MissingPartition {
                    user_id: user.id().to_string(),
                });
            }
            (Some(_), Some(partition)) if partition.is_empty() => {
                return Err(ConfigError::EmptyPartition);
            }
            (Some(user), Some(_)) if user.id().trim().is_empty() => {
                return Err(ConfigError::EmptyUserId);
            }
            (Some(user), Some(_)) if !user.is_logged_in() => {
                return Err(ConfigError::UserNotLoggedIn {
                    user_id: user.id().to_string(),
                    state: user.state(),
                });
            }
            (Some(user), Some(partition)) => Some(SyncCapability::new(
                ConfigurationIdentity::for_target(user.id(), partition),
            )),
        };

        Ok(Configuration {
            path: self.path,
            user: self.user,
            partition,
            capability,
        })
    }
}
