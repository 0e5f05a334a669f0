//! The seam between the registry and whatever actually talks to the server.
//!
//! The registry decides *when* a session exists; a [`SyncService`] decides
//! *what* it is. Implementations own connection state and drive it; the
//! registry only reads it through [`RemoteSession`].

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use super::{SessionState, error::SyncServiceError};
use crate::config::ConfigurationIdentity;

/// Service-side object backing one registry [`Session`](super::Session).
pub trait RemoteSession: Send + Sync + Debug {
    /// Current activity state, as driven by the service.
    fn state(&self) -> SessionState;
}

/// External authority that creates and tears down remote sessions.
///
/// The registry guarantees that for a given identity,
/// `materialize_session` is never called again before `dispose_session` has
/// returned for the previous session.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Create the remote session for `identity`.
    ///
    /// May suspend for as long as it needs; the registry holds no locks
    /// while this runs.
    async fn materialize_session(
        &self,
        identity: &ConfigurationIdentity,
    ) -> Result<Arc<dyn RemoteSession>, SyncServiceError>;

    /// Tear down the remote session for `identity`.
    ///
    /// Called exactly once per materialized session, after eviction or
    /// shutdown.
    fn dispose_session(&self, identity: &ConfigurationIdentity);

    /// Pause activity for `identity` without disposing it.
    ///
    /// Used when a user logs out. The default does nothing.
    fn suspend_session(&self, identity: &ConfigurationIdentity) {
        let _ = identity;
    }
}
