// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn mint_and_validate_round_trip() {
    let issuer = TokenIssuer::new("secret", 3600);
    let token = issuer.mint("user-1").unwrap();
    assert_eq!(issuer.validate(&token).unwrap(), "user-1");
}

#[test]
fn token_without_expiry_validates() {
    let issuer = TokenIssuer::new("secret", 0);
    let token = issuer.mint("user-1").unwrap();
    assert_eq!(issuer.validate(&token).unwrap(), "user-1");
}

#[test]
fn wrong_secret_is_rejected() {
    let token = TokenIssuer::new("secret", 3600).mint("user-1").unwrap();
    let other = TokenIssuer::new("different", 3600);
    assert!(matches!(other.validate(&token), Err(AuthError::Token(_))));
}

#[test]
fn garbage_token_is_rejected() {
    let issuer = TokenIssuer::new("secret", 3600);
    assert!(issuer.validate("not-a-token").is_err());
}
