// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post-response hook that recovers from an expired access token.
//!
//! Handles:
//! - 401 detection on the first attempt of a request
//! - One refresh exchange against `token/refresh/` per failed request
//! - Replay of the original request with the new token
//! - Session teardown when the exchange fails

use crate::db::CredentialStoreRef;
use crate::error::{GatewayError, RefreshError};
use crate::middleware::bearer_header;
use crate::models::{PendingRequest, SessionEvent, Slot};
use crate::services::Dispatcher;
use chrono::Utc;
use reqwest::header::HeaderValue;
use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use std::str::FromStr;
use tokio::sync::{broadcast, Mutex};

/// Token refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "token/refresh/";

/// How concurrent 401s share refresh calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Every failed request runs its own refresh exchange.
    #[default]
    Independent,
    /// Failed requests queue behind one in-flight refresh and reuse its
    /// token. All waiters share the outcome.
    Coalesced,
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(RefreshPolicy::Independent),
            "coalesced" => Ok(RefreshPolicy::Coalesced),
            other => Err(format!("unknown refresh policy: {other}")),
        }
    }
}

/// Where a request is in the refresh cycle. Reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Normal,
    Refreshing,
    Failed,
}

/// Refresh endpoint response. Servers that rotate refresh tokens also
/// return a new `refresh`.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Detects authorization failures and runs the refresh-and-replay cycle.
pub struct RefreshCoordinator {
    dispatcher: Dispatcher,
    store: CredentialStoreRef,
    events: broadcast::Sender<SessionEvent>,
    refresh_url: Url,
    login_path: String,
    policy: RefreshPolicy,
    /// Serializes exchanges under [`RefreshPolicy::Coalesced`].
    refresh_lock: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        dispatcher: Dispatcher,
        store: CredentialStoreRef,
        events: broadcast::Sender<SessionEvent>,
        login_path: impl Into<String>,
        policy: RefreshPolicy,
    ) -> Result<Self, GatewayError> {
        let refresh_url = dispatcher.url(REFRESH_PATH)?;

        Ok(Self {
            dispatcher,
            store,
            events,
            refresh_url,
            login_path: login_path.into(),
            policy,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Inspect the response to `request` and recover from a 401 if possible.
    ///
    /// Returns the response unchanged unless it is a 401 on a first attempt.
    /// In that case, with a refresh token stored, the token is renewed and
    /// the request replayed once; the caller gets the replay's response. A
    /// failed exchange clears both tokens, publishes
    /// [`SessionEvent::Expired`] and returns the exchange error.
    pub async fn handle(
        &self,
        request: PendingRequest,
        response: Response,
    ) -> Result<Response, GatewayError> {
        if response.status() != StatusCode::UNAUTHORIZED || request.is_retried() {
            return Ok(response);
        }

        let request = request.into_replay();
        tracing::debug!(
            state = ?RefreshState::Refreshing,
            url = %request.url(),
            "Access token rejected"
        );

        let Some(refresh_token) = self.store.get(Slot::Refresh) else {
            tracing::debug!("No refresh token stored, returning 401 to caller");
            return Ok(response);
        };

        let authorization = match self
            .renew_access(&refresh_token, request.bearer_token())
            .await
        {
            Ok(value) => value,
            Err(RefreshError::SessionEnded) => return Err(RefreshError::SessionEnded.into()),
            Err(e) => {
                self.expire_session(&e);
                return Err(e.into());
            }
        };

        let replay = request.with_authorization(authorization);
        let response = self.dispatcher.execute(&replay).await?;

        tracing::debug!(
            state = ?RefreshState::Normal,
            status = %response.status(),
            "Replayed request after refresh"
        );
        Ok(response)
    }

    /// Obtain a fresh `Authorization` value according to the policy.
    async fn renew_access(
        &self,
        refresh_token: &str,
        stale_access: Option<&str>,
    ) -> Result<HeaderValue, RefreshError> {
        if self.policy == RefreshPolicy::Independent {
            return self.exchange(refresh_token).await;
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we were waiting.
        if let Some(current) = self.store.get(Slot::Access) {
            if Some(current.as_str()) != stale_access {
                if let Some(value) = bearer_header(&current) {
                    tracing::debug!("Reusing token from concurrent refresh");
                    return Ok(value);
                }
            }
        }

        // A failed refresh elsewhere clears the refresh slot.
        let refresh_token = self
            .store
            .get(Slot::Refresh)
            .ok_or(RefreshError::SessionEnded)?;

        self.exchange(&refresh_token).await
    }

    /// Unauthenticated `POST token/refresh/` exchange. Stores the new access
    /// token (and a rotated refresh token, if returned) on success.
    async fn exchange(&self, refresh_token: &str) -> Result<HeaderValue, RefreshError> {
        let body = serde_json::json!({ "refresh": refresh_token }).to_string();
        let request = PendingRequest::new(Method::POST, self.refresh_url.clone()).with_body(body);

        tracing::info!(state = ?RefreshState::Refreshing, "Refreshing access token");

        let response = self
            .dispatcher
            .execute(&request)
            .await
            .map_err(RefreshError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected { status, body });
        }

        let tokens: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;

        let authorization = bearer_header(&tokens.access).ok_or_else(|| {
            RefreshError::MalformedResponse("access token is not a valid header value".to_string())
        })?;

        self.store.set(Slot::Access, &tokens.access);
        if let Some(rotated) = tokens.refresh.as_deref() {
            self.store.set(Slot::Refresh, rotated);
        }

        tracing::info!(
            state = ?RefreshState::Normal,
            rotated = tokens.refresh.is_some(),
            "Access token refreshed"
        );
        let _ = self.events.send(SessionEvent::Refreshed { at: Utc::now() });

        Ok(authorization)
    }

    fn expire_session(&self, error: &RefreshError) {
        self.store.clear_all();

        tracing::warn!(
            state = ?RefreshState::Failed,
            error = %error,
            login_path = %self.login_path,
            "Token refresh failed, session expired"
        );

        // No subscribers is fine; the caller still gets the error.
        let _ = self.events.send(SessionEvent::Expired {
            login_path: self.login_path.clone(),
            at: Utc::now(),
        });
    }
}
