//! Canonical identity of a sync target and the capability tag that proves a
//! configuration has one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical key for a remote sync target: `(user id, partition)`.
///
/// Two configurations that point at the same remote target produce equal
/// identities, whatever their local path or other settings. Non-sync
/// configurations produce an identity with both halves unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigurationIdentity {
    user_id: Option<String>,
    partition: Option<String>,
}

impl ConfigurationIdentity {
    /// Build an identity from raw parts, normalizing both.
    pub fn new(user_id: Option<&str>, partition: Option<&str>) -> Self {
        Self {
            user_id: user_id.map(|id| id.trim().to_string()),
            partition: partition.map(normalize_partition),
        }
    }

    /// Identity of a sync target.
    pub fn for_target(user_id: &str, partition: &str) -> Self {
        Self::new(Some(user_id), Some(partition))
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Whether both halves of the sync target are present.
    pub fn is_sync_target(&self) -> bool {
        self.user_id.is_some() && self.partition.is_some()
    }
}

impl fmt::Display for ConfigurationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user_id, &self.partition) {
            (Some(user), Some(partition)) => write!(f, "{user}@{partition}"),
            (Some(user), None) => write!(f, "{user}@<none>"),
            (None, Some(partition)) => write!(f, "<none>@{partition}"),
            (None, None) => f.write_str("<local>"),
        }
    }
}

/// Normalize a partition descriptor.
///
/// Surrounding whitespace is dropped and path-like descriptors lose repeated
/// and trailing separators, so `/~/notes/` and `/~//notes` name the same
/// partition as `/~/notes`.
pub(crate) fn normalize_partition(partition: &str) -> String {
    let trimmed = partition.trim();
    if !trimmed.contains('/') {
        return trimmed.to_string();
    }
    let rooted = trimmed.starts_with('/');
    let joined = trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Marker proving a configuration is sync-enabled.
///
/// Only [`ConfigurationBuilder`](super::ConfigurationBuilder) can create one,
/// and only when both a logged-in user and a partition are present. It
/// carries the identity so the registry never re-derives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCapability {
    identity: ConfigurationIdentity,
}

impl SyncCapability {
    pub(super) fn new(identity: ConfigurationIdentity) -> Self {
        debug_assert!(identity.is_sync_target());
        Self { identity }
    }

    pub fn identity(&self) -> &ConfigurationIdentity {
        &self.identity
    }
}
