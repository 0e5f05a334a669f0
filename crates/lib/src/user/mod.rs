//! Remote user accounts as seen by the session registry.
//!
//! A [`User`] is a value snapshot of an account on the sync server. The
//! registry only cares about the user's identity and whether the account is
//! logged in when a sync configuration is built.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Login state of a remote user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    /// The user holds valid credentials.
    LoggedIn,
    /// The user logged out; existing data stays on disk.
    LoggedOut,
    /// The user was removed from the device.
    Removed,
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserState::LoggedIn => "logged_in",
            UserState::LoggedOut => "logged_out",
            UserState::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// A remote user account.
///
/// Users compare equal by id only; display metadata and state are incidental.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: String,
    name: Option<String>,
    state: UserState,
}

impl User {
    /// Create a logged-in user with the given server-side id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            state: UserState::LoggedIn,
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Return a copy of this user in a different login state.
    pub fn with_state(mut self, state: UserState) -> Self {
        self.state = state;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> UserState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == UserState::LoggedIn
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl std::hash::Hash for User {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
