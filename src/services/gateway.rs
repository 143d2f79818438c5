// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated request gateway.
//!
//! Single entry point for API calls. Every request goes through:
//! 1. the auth injector (attach the stored access token),
//! 2. the dispatcher (send against the configured base URL),
//! 3. the refresh coordinator (one silent refresh-and-replay on 401).

use crate::config::Config;
use crate::db::CredentialStoreRef;
use crate::error::GatewayError;
use crate::middleware::AuthInjector;
use crate::models::{PendingRequest, SessionEvent, Slot, TokenPair};
use crate::services::refresh::{RefreshCoordinator, RefreshPolicy};
use crate::services::Dispatcher;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the session event channel. Events are rare; a lagging
/// subscriber only loses old ones.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Cloneable handle to the request pipeline.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    dispatcher: Dispatcher,
    injector: AuthInjector,
    coordinator: RefreshCoordinator,
    store: CredentialStoreRef,
    events: broadcast::Sender<SessionEvent>,
}

impl Gateway {
    /// Create a gateway for the environment selected in `config`.
    pub fn new(config: &Config, store: CredentialStoreRef) -> Result<Self, GatewayError> {
        let dispatcher = Dispatcher::new(config)?;
        Self::from_parts(
            dispatcher,
            store,
            config.login_path.clone(),
            config.refresh_policy,
        )
    }

    /// Assemble a gateway from an existing dispatcher.
    pub fn from_parts(
        dispatcher: Dispatcher,
        store: CredentialStoreRef,
        login_path: String,
        policy: RefreshPolicy,
    ) -> Result<Self, GatewayError> {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        let coordinator = RefreshCoordinator::new(
            dispatcher.clone(),
            store.clone(),
            events.clone(),
            login_path,
            policy,
        )?;

        tracing::info!(
            base_url = %dispatcher.base_url(),
            policy = ?policy,
            "Request gateway initialized"
        );

        Ok(Self {
            inner: Arc::new(GatewayInner {
                injector: AuthInjector::new(store.clone()),
                dispatcher,
                coordinator,
                store,
                events,
            }),
        })
    }

    // ─── Requests ────────────────────────────────────────────────────────────

    pub fn get(&self, path: &str) -> GatewayRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> GatewayRequest {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> GatewayRequest {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> GatewayRequest {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> GatewayRequest {
        self.request(Method::DELETE, path)
    }

    /// Start a request to `path`, relative to the API base URL.
    pub fn request(&self, method: Method, path: &str) -> GatewayRequest {
        GatewayRequest {
            gateway: self.clone(),
            method,
            path: path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Run a prepared request through inject → dispatch → refresh.
    pub async fn send(&self, request: PendingRequest) -> Result<Response, GatewayError> {
        let request = self.inner.injector.authorize(request);
        let response = self.inner.dispatcher.execute(&request).await?;
        self.inner.coordinator.handle(request, response).await
    }

    // ─── Session ─────────────────────────────────────────────────────────────

    /// Store the tokens handed out by a successful login.
    pub fn login_with(&self, tokens: &TokenPair) {
        self.inner.store.store_pair(tokens);
        tracing::info!("Session credentials stored");
    }

    /// Drop both tokens and tell subscribers the user logged out.
    pub fn logout(&self) {
        self.inner.store.clear_all();
        tracing::info!("Session credentials cleared");
        let _ = self.inner.events.send(SessionEvent::LoggedOut { at: Utc::now() });
    }

    /// True while an access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.get(Slot::Access).is_some()
    }

    /// Receive session events (refresh, expiry, logout).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn store(&self) -> &CredentialStoreRef {
        &self.inner.store
    }

    pub fn base_url(&self) -> &str {
        self.inner.dispatcher.base_url()
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.inner.coordinator.policy()
    }
}

/// Builder for a single gateway call.
#[must_use = "requests do nothing until sent"]
pub struct GatewayRequest {
    gateway: Gateway,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    /// First builder error, reported on send.
    error: Option<GatewayError>,
}

impl GatewayRequest {
    /// Append a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(bytes),
            Err(e) if self.error.is_none() => {
                self.error = Some(GatewayError::InvalidRequest(format!(
                    "failed to serialize body: {e}"
                )));
            }
            Err(_) => {}
        }
        self
    }

    /// Raw payload, sent with the dispatcher's default content type
    /// unless a header overrides it.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Resolve into a replayable request without sending it.
    pub fn build(self) -> Result<(Gateway, PendingRequest), GatewayError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut url = self.gateway.inner.dispatcher.url(&self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut request = PendingRequest::new(self.method, url).with_headers(self.headers);
        if let Some(body) = self.body {
            request = request.with_body(body);
        }

        Ok((self.gateway, request))
    }

    /// Send and return the response, whatever its status.
    pub async fn send(self) -> Result<Response, GatewayError> {
        let (gateway, request) = self.build()?;
        gateway.send(request).await
    }

    /// Send and decode a JSON body. Non-2xx statuses become
    /// [`GatewayError::Status`].
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, GatewayError> {
        let response = self.send().await?;
        read_json(response).await
    }
}

/// Check response status and parse the JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status { status, body });
    }

    response
        .json()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}
