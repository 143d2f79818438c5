// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pre-send hook that attaches the stored access token.

use crate::db::CredentialStoreRef;
use crate::models::{PendingRequest, Slot};
use reqwest::header::HeaderValue;

/// Stamps `Authorization: Bearer <access>` on outgoing requests.
#[derive(Clone)]
pub struct AuthInjector {
    store: CredentialStoreRef,
}

impl AuthInjector {
    pub fn new(store: CredentialStoreRef) -> Self {
        Self { store }
    }

    /// Attach the current access token, if there is one.
    ///
    /// Never fails: without a token the request goes out unauthenticated,
    /// which is what public endpoints expect.
    pub fn authorize(&self, request: PendingRequest) -> PendingRequest {
        let Some(token) = self.store.get(Slot::Access) else {
            return request;
        };

        match bearer_header(&token) {
            Some(value) => request.with_authorization(value),
            None => {
                tracing::warn!("Stored access token is not a valid header value, sending without it");
                request
            }
        }
    }
}

/// Build a sensitive `Bearer` header value, or `None` if the token contains
/// bytes that cannot appear in a header.
pub fn bearer_header(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}
