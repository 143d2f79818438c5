// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Carebook client: authenticated access to the Carebook booking API
//!
//! This crate provides the request gateway used by the patient, nurse and
//! admin front ends. It attaches the stored access token to every call,
//! silently refreshes an expired token once per request, and ends the
//! session when the refresh token is no longer accepted.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use db::{CredentialStore, CredentialStoreRef};
pub use error::{GatewayError, RefreshError};
pub use models::{SessionEvent, Slot, TokenPair};
pub use services::Gateway;
