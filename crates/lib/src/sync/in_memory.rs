//! In-process [`SyncService`] with no network.
//!
//! Useful for embedding hosts that sync elsewhere, for demos, and for tests:
//! it drives the session state machine, counts calls, and can inject
//! latency and failures.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{
    SessionState,
    error::SyncServiceError,
    service::{RemoteSession, SyncService},
};
use crate::config::ConfigurationIdentity;

/// Remote session owned by [`InMemorySyncService`].
#[derive(Debug)]
pub struct InMemorySession {
    identity: ConfigurationIdentity,
    state: Mutex<SessionState>,
}

impl InMemorySession {
    fn new(identity: ConfigurationIdentity) -> Self {
        Self {
            identity,
            state: Mutex::new(SessionState::Inactive),
        }
    }

    pub fn identity(&self) -> &ConfigurationIdentity {
        &self.identity
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn transition(&self, next: SessionState) -> Result<(), SyncServiceError> {
        let mut state = self.state.lock().unwrap();
        if !state.can_transition_to(next) {
            return Err(SyncServiceError::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        trace!(identity = %self.identity, from = %*state, to = %next, "Session transition");
        *state = next;
        Ok(())
    }

    fn connect(&self) -> Result<(), SyncServiceError> {
        self.transition(SessionState::Connecting)?;
        self.transition(SessionState::Active)
    }
}

impl RemoteSession for InMemorySession {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }
}

/// A [`SyncService`] that keeps sessions in memory.
#[derive(Debug)]
pub struct InMemorySyncService {
    sessions: Mutex<HashMap<ConfigurationIdentity, Arc<InMemorySession>>>,
    failures: Mutex<VecDeque<SyncServiceError>>,
    latency: Mutex<Duration>,
    auto_connect: bool,
    materialized: AtomicUsize,
    disposed: AtomicUsize,
    suspended: AtomicUsize,
}

impl Default for InMemorySyncService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySyncService {
    /// A service whose sessions connect as soon as they are materialized.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            latency: Mutex::new(Duration::ZERO),
            auto_connect: true,
            materialized: AtomicUsize::new(0),
            disposed: AtomicUsize::new(0),
            suspended: AtomicUsize::new(0),
        }
    }

    /// A service whose sessions stay `Inactive` until [`connect`](Self::connect).
    pub fn manual() -> Self {
        Self {
            auto_connect: false,
            ..Self::new()
        }
    }

    /// Delay every materialization by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = latency;
        self
    }

    /// Make the next materialization fail with `error`.
    pub fn fail_next(&self, error: SyncServiceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Number of `materialize_session` calls that started.
    pub fn materialize_count(&self) -> usize {
        self.materialized.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn suspend_count(&self) -> usize {
        self.suspended.load(Ordering::SeqCst)
    }

    /// The service-side session for `identity`, if materialized.
    pub fn session(&self, identity: &ConfigurationIdentity) -> Option<Arc<InMemorySession>> {
        self.sessions.lock().unwrap().get(identity).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Connect a session: `Inactive`/`Suspended`/`Error` to `Active`.
    pub fn connect(&self, identity: &ConfigurationIdentity) -> Result<(), SyncServiceError> {
        self.require(identity)?.connect()
    }

    /// Mark a session as failed.
    pub fn fail(&self, identity: &ConfigurationIdentity) -> Result<(), SyncServiceError> {
        self.require(identity)?.transition(SessionState::Error)
    }

    fn require(
        &self,
        identity: &ConfigurationIdentity,
    ) -> Result<Arc<InMemorySession>, SyncServiceError> {
        self.session(identity)
            .ok_or_else(|| SyncServiceError::Rejected(format!("no session for {identity}")))
    }
}

#[async_trait]
impl SyncService for InMemorySyncService {
    async fn materialize_session(
        &self,
        identity: &ConfigurationIdentity,
    ) -> Result<Arc<dyn RemoteSession>, SyncServiceError> {
        self.materialized.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(error) = failure {
            debug!(%identity, %error, "Injected materialization failure");
            return Err(error);
        }

        let session = Arc::new(InMemorySession::new(identity.clone()));
        if self.auto_connect {
            session.connect()?;
        }
        self.sessions
            .lock()
            .unwrap()
            .insert(identity.clone(), Arc::clone(&session));
        Ok(session)
    }

    fn dispose_session(&self, identity: &ConfigurationIdentity) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        if let Some(session) = self.sessions.lock().unwrap().remove(identity) {
            let mut state = session.state.lock().unwrap();
            *state = SessionState::Inactive;
        }
    }

    fn suspend_session(&self, identity: &ConfigurationIdentity) {
        if let Some(session) = self.session(identity)
            && session.transition(SessionState::Suspended).is_ok()
        {
            self.suspended.fetch_add(1, Ordering::SeqCst);
        }
    }
}
