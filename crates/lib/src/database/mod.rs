//! Local database instances and their link to a sync session.
//!
//! A [`Database`] is opened against a [`Configuration`]. When the
//! configuration is sync-enabled, opening acquires a counted handle on the
//! shared [`Session`] for its identity; closing or dropping the database
//! gives it back. Record storage itself lives elsewhere.

use std::path::Path;

use tracing::{debug, info};

use crate::{
    Result,
    config::{CapabilityError, Configuration},
    sync::{Session, SessionError, SessionHandle, SessionRegistry},
};

pub mod errors;

pub use errors::DatabaseError;


/// An open local database.
#[derive(Debug)]
pub struct Database {
    config: Configuration,
    session: Option<SessionHandle>,
    closed: bool,
}

impl Database {
    /// Open a database, acquiring its sync session if the configuration is
    /// sync-enabled.
    ///
    /// # Errors
    /// Fails if the registry cannot provide the session, e.g. because the
    /// sync service is unavailable or the registry is shut down.
    pub async fn open(config: Configuration, registry: &SessionRegistry) -> Result<Self> {
        let session = if config.is_sync_enabled() {
            Some(registry.get_or_create_session(&config).await?)
        } else {
            None
        };

        info!(
            path = %config.path().display(),
            identity = %config.identity(),
            sync = session.is_some(),
            "Opened database"
        );
        Ok(Self {
            config,
            session,
            closed: false,
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn path(&self) -> &Path {
        self.config.path()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The sync session this database participates in.
    ///
    /// # Errors
    /// * [`SessionError::NotSyncEnabled`] for a local-only database.
    /// * [`DatabaseError::Closed`] after [`close`](Self::close).
    pub fn sync_session(&self) -> Result<&Session> {
        if self.closed {
            return Err(DatabaseError::Closed {
                path: self.config.path().to_path_buf(),
            }
            .into());
        }
        match &self.session {
            Some(handle) => Ok(handle.session()),
            None => Err(SessionError::NotSyncEnabled(CapabilityError::NotSyncEnabled {
                path: self.config.path().to_path_buf(),
            })
            .into()),
        }
    }

    /// Close the database and release its session. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(handle) = self.session.take() {
            debug!(identity = %handle.identity(), "Releasing session on close");
            drop(handle);
        }
        info!(path = %self.config.path().display(), "Closed database");
    }
}
