// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! qcauthd: the authentication service daemon.

use qc_auth::{router, AuthState, TokenIssuer, UserManager};
use qc_wire::RedisStore;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Config {
    store: StoreConfig,
    auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct StoreConfig {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AuthConfig {
    listen_port: u16,
    jwt_secret: String,
    #[serde(default)]
    token_expiry_secs: u64,
    admin_account: String,
    admin_password: String,
    #[serde(default)]
    anonymous: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .ok_or("usage: qcauthd <config.toml>")?;
    tracing::info!(config = config_path, "reading configuration");
    let config: Config = toml::from_str(&std::fs::read_to_string(&config_path)?)?;

    let store = RedisStore::connect(&config.store.url).await?;
    let users = UserManager::new(store, &config.auth.admin_account, config.auth.anonymous);
    users.set_admin_password(&config.auth.admin_password).await?;

    let anonymous = users.is_anonymous();
    let issuer = TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_expiry_secs);
    let app = router(AuthState { issuer, users });

    let addr = format!("0.0.0.0:{}", config.auth.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if anonymous {
        tracing::info!(addr, "anonymous authentication server running");
    } else {
        tracing::info!(addr, "authentication server running");
    }
    axum::serve(listener, app).await?;
    Ok(())
}
