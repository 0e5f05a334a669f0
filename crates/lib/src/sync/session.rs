//! Session values handed out by the registry.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use handle_trait::Handle;
use serde::{Deserialize, Serialize};

use super::{registry::RegistryInner, service::RemoteSession};
use crate::config::ConfigurationIdentity;

/// Activity state of a sync session.
///
/// Transitions are driven by the [`SyncService`](super::SyncService); the
/// registry never changes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but not connected
    Inactive,
    /// Connection in progress
    Connecting,
    /// Connected and exchanging changes
    Active,
    /// Paused, e.g. after the user logged out
    Suspended,
    /// Failed; needs a new connection attempt
    Error,
}

impl SessionState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Inactive, Connecting)
                | (Connecting, Active)
                | (Connecting, Error)
                | (Connecting, Inactive)
                | (Active, Suspended)
                | (Active, Error)
                | (Active, Inactive)
                | (Suspended, Connecting)
                | (Suspended, Inactive)
                | (Error, Connecting)
                | (Error, Inactive)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Inactive => "inactive",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Suspended => "suspended",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

pub(crate) struct SessionInner {
    identity: ConfigurationIdentity,
    generation: u64,
    remote: Arc<dyn RemoteSession>,
}

/// One logical sync channel for a [`ConfigurationIdentity`].
///
/// Sessions are only created by the
/// [`SessionRegistry`](super::SessionRegistry). Cloning is cheap and yields
/// the same instance; equality is instance identity, so two sessions compare
/// equal only if the registry handed out the same one.
#[derive(Clone, Handle)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(
        identity: ConfigurationIdentity,
        generation: u64,
        remote: Arc<dyn RemoteSession>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                identity,
                generation,
                remote,
            }),
        }
    }

    pub fn identity(&self) -> &ConfigurationIdentity {
        &self.inner.identity
    }

    /// Registry generation this session was created in.
    ///
    /// A session created after an eviction of the same identity has a
    /// larger generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn state(&self) -> SessionState {
        self.inner.remote.state()
    }

    /// The service-side object backing this session.
    pub fn remote(&self) -> &Arc<dyn RemoteSession> {
        &self.inner.remote
    }

    /// Whether `self` and `other` are the same session instance.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.inner.identity)
            .field("generation", &self.inner.generation)
            .field("state", &self.state())
            .finish()
    }
}

/// Counted reference to a [`Session`].
///
/// Holding a handle keeps the session's reference count up. Dropping it, or
/// passing it to [`SessionRegistry::release`](super::SessionRegistry::release),
/// gives the reference back. Cloning takes a new reference.
pub struct SessionHandle {
    session: Session,
    registry: Weak<RegistryInner>,
}

impl SessionHandle {
    pub(crate) fn new(session: Session, registry: Weak<RegistryInner>) -> Self {
        Self { session, registry }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity(&self) -> &ConfigurationIdentity {
        self.session.identity()
    }

    pub(crate) fn belongs_to(&self, registry: &Arc<RegistryInner>) -> bool {
        std::ptr::eq(self.registry.as_ptr(), Arc::as_ptr(registry))
    }
}

impl std::ops::Deref for SessionHandle {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl Clone for SessionHandle {
    fn clone(&self) -> Self {
        if let Some(registry) = self.registry.upgrade() {
            registry.retain(&self.session);
        }
        Self {
            session: self.session.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            RegistryInner::release_session(&registry, &self.session);
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle").field(&self.session).finish()
    }
}
