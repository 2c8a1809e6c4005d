// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User records: `user:{name}` hashes with an `id` and a password hash.

use crate::error::AuthError;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use qc_wire::{keys, StateStore};
use std::sync::OnceLock;

fn username_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| match regex::Regex::new("^[a-zA-Z0-9_.-]+$") {
        Ok(re) => re,
        Err(_) => unreachable!("pattern fixed at compile time"),
    })
}

fn userid_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| match regex::Regex::new("^[a-z0-9]{32}$") {
        Ok(re) => re,
        Err(_) => unreachable!("pattern fixed at compile time"),
    })
}

/// Manages user records in the shared store. In anonymous mode users
/// are minted ids with no password; otherwise the admin account gates
/// user creation and deletion.
#[derive(Clone)]
pub struct UserManager<S> {
    store: S,
    admin: String,
    anonymous: bool,
}

impl<S: StateStore> UserManager<S> {
    pub fn new(store: S, admin: impl Into<String>, anonymous: bool) -> Self {
        Self { store, admin: admin.into(), anonymous }
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub async fn set_admin_password(&self, password: &str) -> Result<(), AuthError> {
        let key = keys::user(&self.admin);
        self.store.hset(&key, "id", "1").await?;
        self.store.hset(&key, "pw", &hash_password(password)?).await?;
        Ok(())
    }

    /// Admin-authorised creation of a named user. Returns the new userid.
    pub async fn add_user(
        &self,
        user: &str,
        password: &str,
        admin_password: &str,
    ) -> Result<String, AuthError> {
        if self.anonymous {
            return Err(AuthError::WrongMode);
        }
        if !self.authenticate(&self.admin, admin_password).await? {
            return Err(AuthError::AdminRequired);
        }
        if !self.username_is_valid(user) {
            return Err(AuthError::InvalidUsername(user.to_string()));
        }
        let userid = uuid::Uuid::new_v4().simple().to_string();
        let key = keys::user(user);
        self.store.hset(&key, "id", &userid).await?;
        self.store.hset(&key, "pw", &hash_password(password)?).await?;
        tracing::info!(user, "user added");
        Ok(userid)
    }

    /// Anonymous-mode registration: the userid is the username.
    pub async fn add_anonymous_user(&self) -> Result<String, AuthError> {
        if !self.anonymous {
            return Err(AuthError::WrongMode);
        }
        let userid = uuid::Uuid::new_v4().simple().to_string();
        self.store.hset(&keys::user(&userid), "id", &userid).await?;
        Ok(userid)
    }

    pub async fn delete_user(&self, user: &str, admin_password: &str) -> Result<(), AuthError> {
        if !self.user_exists(user).await? {
            return Err(AuthError::UnknownUser(user.to_string()));
        }
        if user == self.admin || !self.authenticate(&self.admin, admin_password).await? {
            return Err(AuthError::AdminRequired);
        }
        self.store.del(&keys::user(user)).await?;
        tracing::info!(user, "user deleted");
        Ok(())
    }

    pub async fn userid(&self, user: &str) -> Result<String, AuthError> {
        self.store
            .hget(&keys::user(user), "id")
            .await?
            .ok_or_else(|| AuthError::UnknownUser(user.to_string()))
    }

    pub async fn authenticate(&self, user: &str, password: &str) -> Result<bool, AuthError> {
        if !self.user_exists(user).await? {
            return Err(AuthError::UnknownUser(user.to_string()));
        }
        if self.anonymous && user != self.admin {
            return Ok(true);
        }
        let Some(stored) = self.store.hget(&keys::user(user), "pw").await? else {
            return Ok(false);
        };
        Ok(verify_password(password, &stored))
    }

    pub async fn user_exists(&self, user: &str) -> Result<bool, AuthError> {
        if user == self.admin {
            return Ok(true);
        }
        if !self.username_is_valid(user) {
            return Ok(false);
        }
        Ok(self.store.hget(&keys::user(user), "id").await?.is_some())
    }

    fn username_is_valid(&self, user: &str) -> bool {
        if user == self.admin {
            false
        } else if self.anonymous {
            userid_re().is_match(user)
        } else {
            username_re().is_match(user)
        }
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[path = "users_tests.rs"]
mod tests;
