// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound HTTP calls against the configured API base URL.

use crate::config::Config;
use crate::error::GatewayError;
use crate::models::PendingRequest;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Response, Url};

/// Sends requests to the booking API.
///
/// Every request gets `Content-Type: application/json` unless it sets its own.
#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    base_url: String,
}

impl Dispatcher {
    /// Create a dispatcher for the base URL selected by `config`.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Self::with_client(http, config.api_base_url())
    }

    /// Create a dispatcher around an existing client.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, GatewayError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| GatewayError::InvalidRequest(format!("bad base URL {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidRequest(format!(
                "base URL must be http(s): {base_url}"
            )));
        }

        tracing::debug!(base_url = %base_url, "Request dispatcher initialized");

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL.
    ///
    /// Absolute `http(s)://` URLs are used as given. Relative paths are
    /// appended to the base, keeping any path prefix it has (`/api`).
    pub fn url(&self, path: &str) -> Result<Url, GatewayError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        };

        Url::parse(&raw).map_err(|e| GatewayError::InvalidRequest(format!("bad URL {raw}: {e}")))
    }

    /// Send the request as-is. Any HTTP status is returned as a response;
    /// only transport failures are errors.
    pub async fn execute(&self, request: &PendingRequest) -> Result<Response, reqwest::Error> {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            attempt = ?request.attempt(),
            "Dispatching request"
        );

        let mut builder = request.to_builder(&self.http);
        if !request.headers().contains_key(CONTENT_TYPE) {
            builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        builder.send().await
    }
}
