// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the authentication service's header protocol.

use crate::error::GatewayError;

#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Validate a bearer token; returns the userid on success.
    pub async fn validate(&self, token: &str) -> Result<String, GatewayError> {
        let response = self
            .http
            .get(format!("{}/validate", self.base_url))
            .header("Qcloud-Token", token)
            .send()
            .await?;
        expect_ok(&response)?;
        header(&response, "Qcloud-Server-Userid")
            .ok_or_else(|| GatewayError::AuthRejected("no userid in response".to_string()))
    }

    /// Register an anonymous user; returns (userid, token).
    pub async fn register(&self) -> Result<(String, String), GatewayError> {
        let response = self
            .http
            .get(format!("{}/register", self.base_url))
            .send()
            .await?;
        expect_ok(&response)?;
        let userid = header(&response, "Qcloud-Server-Userid")
            .ok_or_else(|| GatewayError::AuthRejected("no userid in response".to_string()))?;
        let token = header(&response, "Qcloud-Token")
            .ok_or_else(|| GatewayError::AuthRejected("no token in response".to_string()))?;
        Ok((userid, token))
    }
}

fn expect_ok(response: &reqwest::Response) -> Result<(), GatewayError> {
    if header(response, "Qcloud-Server-Status").as_deref() == Some("OK") {
        return Ok(());
    }
    let message = header(response, "Qcloud-Server-Message")
        .unwrap_or_else(|| "authentication failed".to_string());
    Err(GatewayError::AuthRejected(message))
}

fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
