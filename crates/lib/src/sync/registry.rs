//! The session registry.
//!
//! Maps each [`ConfigurationIdentity`] to at most one live [`Session`],
//! creating sessions on demand through a [`SyncService`] and evicting them
//! after their last handle is released and a grace period has passed.
//!
//! All bookkeeping happens under one mutex that is never held across an
//! `.await`. Creation is single-flight: the first caller for an identity
//! parks a `Materializing` slot, calls the service without the lock, then
//! swaps in the live session. Concurrent callers wait on that slot and
//! re-check, so they adopt the winner instead of creating a duplicate.
//! Eviction parks a `Disposing` slot the same way until the service has
//! disposed the old session, so a new session for the identity is never
//! materialized before its predecessor is gone.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use handle_trait::Handle;
use tokio::sync::watch;
use tracing::{Instrument, debug, debug_span, info, trace, warn};

use super::{
    error::SessionError,
    service::SyncService,
    session::{Session, SessionHandle},
    settings::RegistrySettings,
};
use crate::config::{Configuration, ConfigurationIdentity};

/// Registry lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A new session was materialized.
    Created {
        identity: ConfigurationIdentity,
        generation: u64,
    },
    /// An existing session gained a reference.
    Acquired {
        identity: ConfigurationIdentity,
        refs: usize,
    },
    /// A session lost a reference.
    Released {
        identity: ConfigurationIdentity,
        refs: usize,
    },
    /// The last reference was released; disposal is pending.
    EvictionScheduled { identity: ConfigurationIdentity },
    /// The session was removed and handed to the service for disposal.
    Evicted {
        identity: ConfigurationIdentity,
        generation: u64,
    },
}

/// Callback invoked for every [`LifecycleEvent`], outside the registry lock.
pub type LifecycleCallback = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

enum Slot {
    /// A caller is materializing this identity. The sender side is dropped
    /// once it finishes either way.
    Materializing(watch::Receiver<()>),
    Live(LiveSession),
    /// The session was evicted and is being disposed. The sender side is
    /// dropped once `dispose_session` has returned.
    Disposing(watch::Receiver<()>),
}

/// A session taken out of its slot for disposal.
struct Eviction {
    session: Session,
    _done: watch::Sender<()>,
}

struct LiveSession {
    session: Session,
    refs: usize,
    /// Token of the pending eviction task, if any.
    pending_eviction: Option<u64>,
}

#[derive(Default)]
struct RegistryState {
    slots: HashMap<ConfigurationIdentity, Slot>,
    next_generation: u64,
    next_eviction: u64,
    closed: bool,
}

impl RegistryState {
    fn live(&self, identity: &ConfigurationIdentity) -> Option<&LiveSession> {
        match self.slots.get(identity) {
            Some(Slot::Live(live)) => Some(live),
            _ => None,
        }
    }

    fn live_mut(&mut self, session: &Session) -> Option<&mut LiveSession> {
        match self.slots.get_mut(session.identity()) {
            Some(Slot::Live(live)) if live.session.ptr_eq(session) => Some(live),
            _ => None,
        }
    }

    fn live_sessions(&self) -> impl Iterator<Item = &LiveSession> {
        self.slots.values().filter_map(|slot| match slot {
            Slot::Live(live) => Some(live),
            Slot::Materializing(_) | Slot::Disposing(_) => None,
        })
    }

    /// Swap the live session for `identity` with a `Disposing` slot.
    fn begin_eviction(&mut self, identity: &ConfigurationIdentity) -> Option<Eviction> {
        if !matches!(self.slots.get(identity), Some(Slot::Live(_))) {
            return None;
        }
        let Some(Slot::Live(live)) = self.slots.remove(identity) else {
            return None;
        };
        let (done, pending) = watch::channel(());
        self.slots.insert(identity.clone(), Slot::Disposing(pending));
        Some(Eviction {
            session: live.session,
            _done: done,
        })
    }

    /// Remove every live session, for disposal by the caller.
    fn drain_live(&mut self) -> Vec<Session> {
        let mut drained: Vec<Session> = self
            .slots
            .drain()
            .filter_map(|(_, slot)| match slot {
                Slot::Live(live) => Some(live.session),
                Slot::Materializing(_) | Slot::Disposing(_) => None,
            })
            .collect();
        drained.sort_by(|a, b| a.identity().cmp(b.identity()));
        drained
    }
}

enum Acquire {
    Ready(SessionHandle),
    Wait(watch::Receiver<()>),
    Create(watch::Sender<()>),
}

pub(crate) struct RegistryInner {
    service: Arc<dyn SyncService>,
    settings: RegistrySettings,
    state: Mutex<RegistryState>,
    callbacks: Mutex<Vec<LifecycleCallback>>,
}

impl RegistryInner {
    fn emit(&self, events: &[LifecycleEvent]) {
        if events.is_empty() {
            return;
        }
        let callbacks = self.callbacks.lock().unwrap().clone();
        for event in events {
            for callback in &callbacks {
                callback(event);
            }
        }
    }

    fn dispose(&self, sessions: &[Session]) {
        let mut events = Vec::with_capacity(sessions.len());
        for session in sessions {
            info!(identity = %session.identity(), generation = session.generation(), "Disposing sync session");
            self.service.dispose_session(session.identity());
            events.push(LifecycleEvent::Evicted {
                identity: session.identity().clone(),
                generation: session.generation(),
            });
        }
        self.emit(&events);
    }

    /// Dispose evicted sessions, then free their slots for new sessions.
    fn finish_disposal(&self, evictions: impl IntoIterator<Item = Eviction>) {
        for eviction in evictions {
            let identity = eviction.session.identity();
            self.dispose(std::slice::from_ref(&eviction.session));

            let mut state = self.state.lock().unwrap();
            if matches!(state.slots.get(identity), Some(Slot::Disposing(_))) {
                state.slots.remove(identity);
            }
            // Waiters wake when `eviction` drops, after the lock is released.
        }
    }

    fn begin_acquire(
        self: &Arc<Self>,
        identity: &ConfigurationIdentity,
    ) -> Result<Acquire, SessionError> {
        let (acquire, event) = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Err(SessionError::RegistryClosed);
            }
            match state.slots.get_mut(identity) {
                Some(Slot::Live(live)) => {
                    live.refs += 1;
                    if live.pending_eviction.take().is_some() {
                        debug!(%identity, "Re-acquired session during grace period");
                    }
                    let handle = SessionHandle::new(live.session.clone(), Arc::downgrade(self));
                    let event = LifecycleEvent::Acquired {
                        identity: identity.clone(),
                        refs: live.refs,
                    };
                    (Acquire::Ready(handle), Some(event))
                }
                Some(Slot::Materializing(rx) | Slot::Disposing(rx)) => {
                    (Acquire::Wait(rx.clone()), None)
                }
                None => {
                    let (tx, rx) = watch::channel(());
                    state
                        .slots
                        .insert(identity.clone(), Slot::Materializing(rx));
                    (Acquire::Create(tx), None)
                }
            }
        };

        if let Some(event) = event {
            self.emit(&[event]);
        }
        Ok(acquire)
    }

    async fn materialize(
        self: &Arc<Self>,
        identity: &ConfigurationIdentity,
        done: watch::Sender<()>,
    ) -> Result<SessionHandle, SessionError> {
        let mut pending = PendingSlot {
            inner: self,
            identity,
            armed: true,
            _done: done,
        };

        debug!(%identity, "Materializing sync session");
        let remote = match self.service.materialize_session(identity).await {
            Ok(remote) => remote,
            Err(source) => {
                warn!(%identity, error = %source, "Sync service failed to materialize session");
                return Err(SessionError::MaterializationFailed {
                    identity: identity.clone(),
                    source,
                });
            }
        };

        let mut state = self.state.lock().unwrap();
        if state.closed {
            drop(state);
            drop(pending);
            debug!(%identity, "Registry closed during materialization, discarding session");
            self.service.dispose_session(identity);
            return Err(SessionError::RegistryClosed);
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let session = Session::new(identity.clone(), generation, remote);
        state.slots.insert(
            identity.clone(),
            Slot::Live(LiveSession {
                session: session.clone(),
                refs: 1,
                pending_eviction: None,
            }),
        );
        pending.armed = false;
        drop(state);
        drop(pending);

        info!(%identity, generation, "Created sync session");
        self.emit(&[LifecycleEvent::Created {
            identity: identity.clone(),
            generation,
        }]);
        Ok(SessionHandle::new(session, Arc::downgrade(self)))
    }

    /// Take one more reference on a session that already has a handle.
    pub(crate) fn retain(&self, session: &Session) {
        let mut state = self.state.lock().unwrap();
        if let Some(live) = state.live_mut(session) {
            live.refs += 1;
            live.pending_eviction = None;
        }
    }

    /// Give back one reference; at zero, start the grace period.
    pub(crate) fn release_session(self: &Arc<Self>, session: &Session) {
        let identity = session.identity();
        let grace = self.settings.grace_period();
        let mut events = Vec::new();
        let mut evicted = Vec::new();

        {
            let mut state = self.state.lock().unwrap();
            let token = state.next_eviction;
            state.next_eviction += 1;
            let Some(live) = state.live_mut(session) else {
                trace!(%identity, "Released session is no longer registered");
                return;
            };
            live.refs = live.refs.saturating_sub(1);
            events.push(LifecycleEvent::Released {
                identity: identity.clone(),
                refs: live.refs,
            });
            if live.refs > 0 {
                drop(state);
                self.emit(&events);
                return;
            }

            let runtime = tokio::runtime::Handle::try_current();
            match runtime {
                Ok(runtime) if !grace.is_zero() => {
                    live.pending_eviction = Some(token);
                    events.push(LifecycleEvent::EvictionScheduled {
                        identity: identity.clone(),
                    });

                    debug!(%identity, ?grace, "Scheduled session eviction");
                    let registry = Arc::downgrade(self);
                    let evict = identity.clone();
                    let span = debug_span!("session_eviction", identity = %evict, token);
                    runtime.spawn(
                        async move {
                            tokio::time::sleep(grace).await;
                            if let Some(registry) = registry.upgrade() {
                                registry.finish_eviction(&evict, token);
                            }
                        }
                        .instrument(span),
                    );
                }
                runtime => {
                    if runtime.is_err() && !grace.is_zero() {
                        debug!(%identity, "No async runtime for grace period, evicting now");
                    }
                    evicted.extend(state.begin_eviction(identity));
                }
            }
        }

        self.emit(&events);
        self.finish_disposal(evicted);
    }

    fn finish_eviction(&self, identity: &ConfigurationIdentity, token: u64) {
        let evicted = {
            let mut state = self.state.lock().unwrap();
            let expired = matches!(
                state.slots.get(identity),
                Some(Slot::Live(live)) if live.refs == 0 && live.pending_eviction == Some(token)
            );
            if !expired {
                trace!(%identity, token, "Eviction cancelled");
                return;
            }
            state.begin_eviction(identity)
        };
        self.finish_disposal(evicted);
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let remaining = state.drain_live();
        for session in &remaining {
            self.service.dispose_session(session.identity());
        }
    }
}

/// Removes a `Materializing` slot unless disarmed, so a failed or
/// cancelled materialization leaves nothing behind. Dropping it also drops
/// the watch sender, which wakes every waiter.
struct PendingSlot<'a> {
    inner: &'a RegistryInner,
    identity: &'a ConfigurationIdentity,
    armed: bool,
    _done: watch::Sender<()>,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock().unwrap();
        if matches!(state.slots.get(self.identity), Some(Slot::Materializing(_))) {
            state.slots.remove(self.identity);
            trace!(identity = %self.identity, "Cleared pending session slot");
        }
    }
}

/// Identity-keyed registry of sync sessions.
///
/// The registry is an ordinary value: create one per sync service and pass
/// it to whoever opens databases. Clones share the same state.
///
/// ```
/// # use std::sync::Arc;
/// # use session_registry::{Configuration, User, sync::{InMemorySyncService, SessionRegistry}};
/// # #[tokio::main]
/// # async fn main() -> session_registry::Result<()> {
/// let registry = SessionRegistry::new(Arc::new(InMemorySyncService::new()));
/// let config = Configuration::builder("notes.db")
///     .sync(User::new("alice"), "/~/notes")
///     .build()?;
///
/// let handle = registry.get_or_create_session(&config).await?;
/// assert_eq!(registry.lookup(&config).as_ref(), Some(handle.session()));
/// registry.release(handle);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Handle)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Create a registry with default settings.
    pub fn new(service: Arc<dyn SyncService>) -> Self {
        Self::with_settings(service, RegistrySettings::default())
    }

    pub fn with_settings(service: Arc<dyn SyncService>, settings: RegistrySettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                service,
                settings,
                state: Mutex::new(RegistryState::default()),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.inner.settings
    }

    pub fn service(&self) -> &Arc<dyn SyncService> {
        &self.inner.service
    }

    /// Register a callback for lifecycle events.
    pub fn on_lifecycle<F>(&self, callback: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.inner.callbacks.lock().unwrap().push(Arc::new(callback));
    }

    /// Return a counted handle to the session for `config`, creating it if
    /// needed.
    ///
    /// # Errors
    /// * [`SessionError::NotSyncEnabled`] if `config` is not sync-capable.
    ///   The sync service is not called.
    /// * [`SessionError::MaterializationFailed`] if the service fails. No
    ///   entry is left behind, so the next call retries from scratch.
    /// * [`SessionError::RegistryClosed`] after [`shutdown`](Self::shutdown).
    #[tracing::instrument(level = "debug", skip_all, fields(path = %config.path().display()))]
    pub async fn get_or_create_session(
        &self,
        config: &Configuration,
    ) -> Result<SessionHandle, SessionError> {
        let capability = config.require_sync_capable()?;
        let identity = capability.identity();

        loop {
            match self.inner.begin_acquire(identity)? {
                Acquire::Ready(handle) => return Ok(handle),
                Acquire::Create(done) => return self.inner.materialize(identity, done).await,
                Acquire::Wait(mut pending) => {
                    trace!(%identity, "Waiting for concurrent materialization");
                    // Resolves once the creator finishes or is cancelled.
                    let _ = pending.changed().await;
                }
            }
        }
    }

    /// Give a handle back to the registry.
    ///
    /// Equivalent to dropping it.
    pub fn release(&self, handle: SessionHandle) {
        if !handle.belongs_to(&self.inner) {
            warn!(identity = %handle.identity(), "Releasing a handle from a different registry");
        }
        drop(handle);
    }

    /// Find the live session for `config` without creating one or taking a
    /// reference. Non-sync configurations yield `None`.
    pub fn lookup(&self, config: &Configuration) -> Option<Session> {
        self.try_lookup(config).ok().flatten()
    }

    /// Like [`lookup`](Self::lookup), but reports non-sync configurations.
    pub fn try_lookup(&self, config: &Configuration) -> Result<Option<Session>, SessionError> {
        let capability = config.require_sync_capable()?;
        Ok(self.session_for(capability.identity()))
    }

    /// Find the live session for an identity.
    pub fn session_for(&self, identity: &ConfigurationIdentity) -> Option<Session> {
        let state = self.inner.state.lock().unwrap();
        state.live(identity).map(|live| live.session.clone())
    }

    /// Number of outstanding handles for an identity.
    pub fn ref_count(&self, identity: &ConfigurationIdentity) -> usize {
        let state = self.inner.state.lock().unwrap();
        state.live(identity).map_or(0, |live| live.refs)
    }

    /// Identities with a live session, sorted.
    pub fn identities(&self) -> Vec<ConfigurationIdentity> {
        let state = self.inner.state.lock().unwrap();
        let mut identities: Vec<_> = state
            .live_sessions()
            .map(|live| live.session.identity().clone())
            .collect();
        identities.sort();
        identities
    }

    /// Number of live sessions, including those in their grace period.
    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().live_sessions().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live sessions belonging to a user, sorted by identity.
    pub fn sessions_for_user(&self, user_id: &str) -> Vec<Session> {
        let state = self.inner.state.lock().unwrap();
        let mut sessions: Vec<_> = state
            .live_sessions()
            .filter(|live| live.session.identity().user_id() == Some(user_id))
            .map(|live| live.session.clone())
            .collect();
        sessions.sort_by(|a, b| a.identity().cmp(b.identity()));
        sessions
    }

    /// Ask the service to suspend every live session of a user, e.g. on
    /// logout. Returns the number of sessions suspended.
    pub fn suspend_user(&self, user_id: &str) -> usize {
        let sessions = self.sessions_for_user(user_id);
        for session in &sessions {
            self.inner.service.suspend_session(session.identity());
        }
        info!(user_id, count = sessions.len(), "Suspended user sessions");
        sessions.len()
    }

    /// Dispose every session now and refuse further acquisitions.
    ///
    /// Pending evictions are disposed immediately. Handles still held
    /// elsewhere stay valid as values but no longer count.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.inner.state.lock().unwrap();
            state.closed = true;
            state.drain_live()
        };
        info!(count = drained.len(), "Shutting down session registry");
        self.inner.dispose(&drained);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().unwrap().closed
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().unwrap();
        f.debug_struct("SessionRegistry")
            .field("settings", &self.inner.settings)
            .field("slots", &state.slots.len())
            .field("closed", &state.closed)
            .finish()
    }
}
