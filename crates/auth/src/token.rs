// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HS256 token mint and validation.

use crate::error::AuthError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    userid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// Issues and validates the bearer tokens carried in `Qcloud-Token`.
///
/// A fresh secret invalidates every outstanding token, so anonymous
/// deployments must keep the configured secret stable.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_secs: u64,
}

impl TokenIssuer {
    /// `expiry_secs` of 0 issues tokens that never expire.
    pub fn new(secret: impl Into<String>, expiry_secs: u64) -> Self {
        Self { secret: secret.into(), expiry_secs }
    }

    pub fn mint(&self, userid: &str) -> Result<String, AuthError> {
        let exp = (self.expiry_secs > 0)
            .then(|| chrono::Utc::now().timestamp() as u64 + self.expiry_secs);
        let claims = Claims { userid: userid.to_string(), exp };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Returns the userid claim of a valid token.
    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp stays optional; it is checked when present.
        validation.required_spec_claims.clear();
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims.userid)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
