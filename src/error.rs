// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types surfaced by the request gateway.

use reqwest::StatusCode;
use std::path::PathBuf;

/// Errors returned to callers of the gateway.
///
/// A response with a non-success status is *not* an error at the transport
/// level: `Gateway::send` hands it back as-is. Only the JSON helpers turn
/// it into [`GatewayError::Status`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// True when the session was torn down because the refresh exchange failed.
    ///
    /// Callers use this to stop rendering data and follow the login redirect
    /// instead of showing a generic error.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, GatewayError::Refresh(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            GatewayError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Failure of the `token/refresh/` exchange.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("refresh rejected with HTTP {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),

    /// Another request's refresh failed while this one was waiting on it.
    #[error("session ended during a concurrent refresh")]
    SessionEnded,
}

/// Errors opening a persisted credential store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read credentials from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for gateway calls
pub type Result<T> = std::result::Result<T, GatewayError>;
