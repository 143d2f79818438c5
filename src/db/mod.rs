//! Credential storage.
//!
//! The store is constructed once at startup and shared by handle between the
//! auth injector (reads) and the refresh coordinator (writes). Calls never
//! fail: an absent token is `None`, and persistence problems are logged by
//! the backend that hit them.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use crate::models::{Slot, TokenPair};
use std::sync::Arc;

/// Key/value holder for the `access` and `refresh` tokens.
///
/// Last write wins; implementations only need to be safe to share.
pub trait CredentialStore: Send + Sync {
    /// Stored value for `slot`, or `None` if absent.
    fn get(&self, slot: Slot) -> Option<String>;

    /// Overwrite the value for `slot`.
    fn set(&self, slot: Slot, value: &str);

    /// Remove the value for `slot`. Clearing an empty slot is a no-op.
    fn clear(&self, slot: Slot);

    /// Both tokens, if both are present.
    fn load_pair(&self) -> Option<TokenPair> {
        Some(TokenPair {
            access: self.get(Slot::Access)?,
            refresh: self.get(Slot::Refresh)?,
        })
    }

    fn store_pair(&self, pair: &TokenPair) {
        self.set(Slot::Access, &pair.access);
        self.set(Slot::Refresh, &pair.refresh);
    }

    fn clear_all(&self) {
        for slot in Slot::ALL {
            self.clear(slot);
        }
    }
}

/// Shared handle to the process-wide credential store.
pub type CredentialStoreRef = Arc<dyn CredentialStore>;
