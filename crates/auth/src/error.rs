// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidCredentials,

    #[error("invalid admin password, permission denied")]
    AdminRequired,

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("missing header: {0}")]
    MissingHeader(String),

    #[error("request not valid for this server mode")]
    WrongMode,

    #[error("token invalid: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hash: {0}")]
    Hash(argon2::password_hash::Error),

    #[error(transparent)]
    Store(#[from] qc_wire::StoreError),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(error: argon2::password_hash::Error) -> Self {
        AuthError::Hash(error)
    }
}
