//! In-memory credential store.

use super::CredentialStore;
use crate::models::Slot;
use dashmap::DashMap;

/// Credential store that lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: DashMap<Slot, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, slot: Slot) -> Option<String> {
        self.slots.get(&slot).map(|v| v.value().clone())
    }

    fn set(&self, slot: Slot, value: &str) {
        self.slots.insert(slot, value.to_string());
    }

    fn clear(&self, slot: Slot) {
        self.slots.remove(&slot);
    }
}
