// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request hooks run around every outgoing call.

pub mod auth;

pub use auth::{bearer_header, AuthInjector};
