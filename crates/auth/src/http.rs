// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface of the authentication service.
//!
//! Every response is 200 with the outcome in headers:
//! `Qcloud-Server-Status: OK` plus result headers on success,
//! `Qcloud-Server-Message` with the failure otherwise.

use crate::error::AuthError;
use crate::token::TokenIssuer;
use crate::users::UserManager;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use qc_wire::StateStore;
use std::sync::Arc;

pub struct AuthState<S> {
    pub issuer: TokenIssuer,
    pub users: UserManager<S>,
}

pub fn router<S: StateStore + 'static>(state: AuthState<S>) -> Router {
    Router::new()
        .route("/token", get(request_token))
        .route("/adduser", get(add_user))
        .route("/register", get(register))
        .route("/validate", get(validate))
        .with_state(Arc::new(state))
}

fn ok_response(pairs: &[(&str, &str)]) -> Response {
    let mut headers = HeaderMap::new();
    set_header(&mut headers, "Qcloud-Server-Status", "OK");
    for (name, value) in pairs {
        set_header(&mut headers, name, value);
    }
    (headers, ()).into_response()
}

fn error_response(error: &AuthError) -> Response {
    tracing::warn!(%error, "auth request failed");
    let mut headers = HeaderMap::new();
    set_header(&mut headers, "Qcloud-Server-Message", &error.to_string());
    (headers, ()).into_response()
}

fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let Ok(name) = axum::http::HeaderName::try_from(name.to_string()) else {
        return;
    };
    if let Ok(value) = axum::http::HeaderValue::try_from(value) {
        headers.insert(name, value);
    }
}

fn required<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, AuthError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AuthError::MissingHeader(name.to_string()))
}

async fn request_token<S: StateStore>(
    State(state): State<Arc<AuthState<S>>>,
    headers: HeaderMap,
) -> Response {
    let result = async {
        let user = required(&headers, "Qcloud-Client-User")?;
        let password = required(&headers, "Qcloud-Client-Password")?;
        if !state.users.authenticate(user, password).await? {
            return Err(AuthError::InvalidCredentials);
        }
        let userid = state.users.userid(user).await?;
        let token = state.issuer.mint(&userid)?;
        tracing::info!(user, "token issued");
        Ok((userid, token))
    }
    .await;
    match result {
        Ok((userid, token)) => ok_response(&[
            ("Qcloud-Server-Userid", &userid),
            ("Qcloud-Token", &token),
        ]),
        Err(error) => error_response(&error),
    }
}

async fn add_user<S: StateStore>(
    State(state): State<Arc<AuthState<S>>>,
    headers: HeaderMap,
) -> Response {
    let result = async {
        let user = required(&headers, "Qcloud-Client-User")?;
        let password = required(&headers, "Qcloud-Client-Password")?;
        let authorisation = required(&headers, "Qcloud-Client-Authorisation")?;
        let userid = state.users.add_user(user, password, authorisation).await?;
        let token = state.issuer.mint(&userid)?;
        Ok((userid, token))
    }
    .await;
    match result {
        Ok((userid, token)) => ok_response(&[
            ("Qcloud-Server-Userid", &userid),
            ("Qcloud-Token", &token),
        ]),
        Err(error) => error_response(&error),
    }
}

async fn register<S: StateStore>(State(state): State<Arc<AuthState<S>>>) -> Response {
    let result = async {
        let userid = state.users.add_anonymous_user().await?;
        let token = state.issuer.mint(&userid)?;
        tracing::info!(userid, "anonymous user registered");
        Ok((userid, token))
    }
    .await;
    match result {
        Ok((userid, token)) => ok_response(&[
            ("Qcloud-Server-Userid", &userid),
            ("Qcloud-Token", &token),
        ]),
        Err(error) => error_response(&error),
    }
}

async fn validate<S: StateStore>(
    State(state): State<Arc<AuthState<S>>>,
    headers: HeaderMap,
) -> Response {
    let result: Result<String, AuthError> = (|| {
        let token = required(&headers, "Qcloud-Token")?;
        state.issuer.validate(token)
    })();
    match result {
        Ok(userid) => ok_response(&[("Qcloud-Server-Userid", &userid)]),
        Err(error) => error_response(&error),
    }
}
