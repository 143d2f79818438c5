// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use carebook_client::db::MemoryCredentialStore;
use carebook_client::services::{Dispatcher, RefreshPolicy};
use carebook_client::{CredentialStore, Gateway, Slot};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Generous timeout so a slow CI box never trips it by accident.
const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a store seeded with the given tokens.
#[allow(dead_code)]
pub fn seeded_store(access: Option<&str>, refresh: Option<&str>) -> Arc<MemoryCredentialStore> {
    let store = Arc::new(MemoryCredentialStore::new());
    if let Some(access) = access {
        store.set(Slot::Access, access);
    }
    if let Some(refresh) = refresh {
        store.set(Slot::Refresh, refresh);
    }
    store
}

/// Create a gateway pointed at the mock backend.
#[allow(dead_code)]
pub fn gateway_for(
    server: &MockServer,
    store: Arc<MemoryCredentialStore>,
    policy: RefreshPolicy,
) -> Gateway {
    gateway_with_timeout(server, store, policy, DEFAULT_TEST_TIMEOUT)
}

/// Create a gateway with a custom transport timeout.
#[allow(dead_code)]
pub fn gateway_with_timeout(
    server: &MockServer,
    store: Arc<MemoryCredentialStore>,
    policy: RefreshPolicy,
    timeout: Duration,
) -> Gateway {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build test client");
    let dispatcher = Dispatcher::with_client(http, &server.uri()).expect("Invalid mock URI");

    Gateway::from_parts(dispatcher, store, "/login".to_string(), policy)
        .expect("Failed to build gateway")
}
