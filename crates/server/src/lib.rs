// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qc-server: the HTTP gateway.
//!
//! A thin adapter over the job manager and the authentication service.
//! Outcomes travel in response headers (`Qcloud-Server-Status`,
//! `Qcloud-Server-Message`, …), matching the client protocol.

pub mod auth_client;
pub mod error;
pub mod gateway;

pub use auth_client::AuthClient;
pub use error::GatewayError;
pub use gateway::{router, GatewayState};
