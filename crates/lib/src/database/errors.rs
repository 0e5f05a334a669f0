//! Error types for local database instances.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`Database`](super::Database).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    /// The database was closed.
    #[error("Database '{}' is closed", path.display())]
    Closed {
        /// Local path of the closed database
        path: PathBuf,
    },
}

impl DatabaseError {
    pub fn is_closed(&self) -> bool {
        matches!(self, DatabaseError::Closed { .. })
    }
}

impl From<DatabaseError> for crate::Error {
    fn from(err: DatabaseError) -> Self {
        crate::Error::Database(err)
    }
}
