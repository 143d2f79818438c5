//! Session lifecycle events emitted to the hosting application.

use chrono::{DateTime, Utc};

/// Events published on the gateway's session channel.
///
/// The host binds [`SessionEvent::Expired`] to its own navigation (a
/// browser redirect, a TUI login screen, a CLI exit code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The access token was renewed through the refresh endpoint
    Refreshed { at: DateTime<Utc> },
    /// The refresh exchange failed; credentials are gone and the user
    /// must log in again at `login_path`
    Expired {
        login_path: String,
        at: DateTime<Utc>,
    },
    /// Credentials were cleared by an explicit logout
    LoggedOut { at: DateTime<Utc> },
}

impl SessionEvent {
    /// Navigation target, if this event requires the user to log in.
    pub fn login_path(&self) -> Option<&str> {
        match self {
            SessionEvent::Expired { login_path, .. } => Some(login_path),
            _ => None,
        }
    }
}
