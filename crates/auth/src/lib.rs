// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qc-auth: bearer-token authentication service.
//!
//! Issues HS256 JWTs for named or anonymous users and validates them
//! for the gateway. User records live in the shared state store under
//! `user:{name}`.

pub mod error;
pub mod http;
pub mod token;
pub mod users;

pub use error::AuthError;
pub use http::{router, AuthState};
pub use token::TokenIssuer;
pub use users::UserManager;
