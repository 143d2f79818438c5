// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - request pipeline.

pub mod dispatcher;
pub mod gateway;
pub mod refresh;

pub use dispatcher::Dispatcher;
pub use gateway::{read_json, Gateway, GatewayRequest};
pub use refresh::{RefreshCoordinator, RefreshPolicy, RefreshState, REFRESH_PATH};
