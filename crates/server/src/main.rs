// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! qcwebd: the compute-service HTTP gateway daemon.

use qc_engine::{HeadNode, JobManager, SlurmClient, SolverPaths};
use qc_server::{router, AuthClient, GatewayState};
use qc_wire::{AmqpBus, RedisStore};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Config {
    store: StoreConfig,
    bus: BusConfig,
    jobs: JobsConfig,
    server: ServerConfig,
    head_node: Option<HeadNodeConfig>,
}

#[derive(Debug, Deserialize)]
struct StoreConfig {
    url: String,
}

#[derive(Debug, Deserialize)]
struct BusConfig {
    url: String,
}

#[derive(Debug, Deserialize)]
struct JobsConfig {
    workdir_root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    listen_port: u16,
    auth_url: String,
}

/// Enables the synchronous `$batch` submission path.
#[derive(Debug, Deserialize)]
struct HeadNodeConfig {
    queue_id: String,
    bin_dir: PathBuf,
    user: String,
    #[serde(default)]
    solver: SolverPaths,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .ok_or("usage: qcwebd <config.toml>")?;
    tracing::info!(config = config_path, "reading configuration");
    let config: Config = toml::from_str(&std::fs::read_to_string(&config_path)?)?;

    let store = RedisStore::connect(&config.store.url).await?;
    let bus = AmqpBus::connect(&config.bus.url).await?;

    let mut manager = JobManager::new(store, bus, config.jobs.workdir_root);
    if let Some(head) = config.head_node {
        manager = manager.with_head_node(HeadNode {
            queue_id: head.queue_id,
            client: SlurmClient::new(head.bin_dir, head.user),
            solver: head.solver,
        });
    }

    let auth = AuthClient::new(config.server.auth_url);
    let app = router(GatewayState { manager, auth });

    let addr = format!("0.0.0.0:{}", config.server.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr, "compute service gateway running");
    axum::serve(listener, app).await?;
    Ok(())
}
