// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the gateway.

pub mod credentials;
pub mod request;
pub mod session;

pub use credentials::{mask_token, Slot, TokenPair};
pub use request::{Attempt, PendingRequest};
pub use session::SessionEvent;
