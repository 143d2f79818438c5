//! Credential slots and token pairs.

use std::fmt;
use std::str::FromStr;

/// Named slot in the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Short-lived bearer token sent with every request
    Access,
    /// Long-lived token exchanged for a new access token
    Refresh,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Access, Slot::Refresh];

    /// Persistence key for this slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Access => "access",
            Slot::Refresh => "refresh",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Slot::Access),
            "refresh" => Ok(Slot::Refresh),
            other => Err(format!("unknown credential slot: {other}")),
        }
    }
}

/// Access + refresh tokens handed over at login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens must never end up in logs via `{:?}`.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &mask_token(&self.access))
            .field("refresh", &mask_token(&self.refresh))
            .finish()
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}
