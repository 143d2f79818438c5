// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Replayable description of an outgoing request.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};

/// Which attempt of a logical call this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First attempt, before any refresh
    Original,
    /// Re-issued once after a successful token refresh
    Replay,
}

/// An outgoing request that can be re-sent once after a token refresh.
///
/// Everything except the attempt marker and the `Authorization` header is
/// fixed at construction. The body is buffered so the replay sends exactly
/// the same bytes.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    attempt: Attempt,
}

impl PendingRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            attempt: Attempt::Original,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// True once the request has been through a refresh.
    pub fn is_retried(&self) -> bool {
        self.attempt == Attempt::Replay
    }

    /// Token currently carried in the `Authorization` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
    }

    /// Stamp the `Authorization` header.
    pub fn with_authorization(mut self, value: HeaderValue) -> Self {
        self.headers.insert(AUTHORIZATION, value);
        self
    }

    /// Marks the request as retried. Consumes the original so a second
    /// replay can only be built from the returned value.
    pub fn into_replay(mut self) -> Self {
        self.attempt = Attempt::Replay;
        self
    }

    /// Build a reqwest request on the given client.
    pub fn to_builder(&self, http: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = http
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());

        match &self.body {
            Some(body) => builder.body(body.clone()),
            None => builder,
        }
    }
}
