//! Synchronization sessions.
//!
//! The sync module owns the mapping from configuration identity to sync
//! session. A [`SessionRegistry`] hands out counted [`SessionHandle`]s for
//! sync-enabled configurations, asks a [`SyncService`] to materialize the
//! underlying remote session the first time an identity is used, and asks it
//! to dispose the session once nobody has used it for a grace period.
//!
//! Non-sync configurations are rejected with
//! [`SessionError::NotSyncEnabled`] before the service is ever contacted.

pub mod error;
pub mod in_memory;
pub mod registry;
pub mod service;
pub mod session;
pub mod settings;

pub use error::{SessionError, SyncServiceError};
pub use in_memory::{InMemorySession, InMemorySyncService};
pub use registry::{LifecycleCallback, LifecycleEvent, SessionRegistry};
pub use service::{RemoteSession, SyncService};
pub use session::{Session, SessionHandle, SessionState};
pub use settings::{DEFAULT_EVICTION_GRACE_MS, RegistrySettings};
