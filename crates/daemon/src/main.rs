// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! qcmond: runs the local queue monitor and one remote queue monitor
//! per configured backend.

use qc_daemon::{BackendConfig, BackendKind, Config};
use qc_engine::{
    LocalConnector, LocalQueueMonitor, RemoteQueueMonitor, SlurmClient, SlurmConnector,
    SshConnector,
};
use qc_wire::{AmqpBus, RedisStore};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .ok_or("usage: qcmond <config.toml>")?;
    tracing::info!(config = config_path, "reading configuration");
    let config = Config::from_toml(&std::fs::read_to_string(&config_path)?)?;

    let store = RedisStore::connect(&config.store.url).await?;
    let bus = AmqpBus::connect(&config.bus.url).await?;

    let shutdown = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    let local = LocalQueueMonitor::new(store.clone(), bus.clone());
    let token = shutdown.clone();
    tasks.spawn(async move {
        if let Err(error) = local.run(token).await {
            tracing::error!(%error, "local queue monitor stopped");
        }
    });

    for backend in config.backends {
        spawn_backend(&mut tasks, backend, store.clone(), bus.clone(), shutdown.clone());
    }

    shutdown_signal().await;
    tracing::info!("shutting down");
    shutdown.cancel();
    while tasks.join_next().await.is_some() {}
    Ok(())
}

fn spawn_backend(
    tasks: &mut tokio::task::JoinSet<()>,
    backend: BackendConfig,
    store: RedisStore,
    bus: AmqpBus,
    shutdown: CancellationToken,
) {
    let period = Duration::from_secs(backend.update_period_secs);
    let id = backend.id;
    tracing::info!(queue = id, period_secs = period.as_secs(), "starting backend monitor");
    match backend.kind {
        BackendKind::Local { solver_dir, maxjobs, time_limit_secs, mem_limit_mb } => {
            let connector = LocalConnector::new(solver_dir, maxjobs, time_limit_secs, mem_limit_mb);
            let monitor = RemoteQueueMonitor::new(id.clone(), connector, store, bus, period);
            tasks.spawn(monitor_task(id, monitor.run(shutdown)));
        }
        BackendKind::Slurm { bin_dir, user, maxjobs, solver } => {
            let connector = SlurmConnector::new(SlurmClient::new(bin_dir, user), solver, maxjobs);
            let monitor = RemoteQueueMonitor::new(id.clone(), connector, store, bus, period);
            tasks.spawn(monitor_task(id, monitor.run(shutdown)));
        }
        BackendKind::Ssh(ssh) => {
            let connector = SshConnector::new(ssh);
            let monitor = RemoteQueueMonitor::new(id.clone(), connector, store, bus, period);
            tasks.spawn(monitor_task(id, monitor.run(shutdown)));
        }
    }
}

async fn monitor_task(
    id: String,
    run: impl std::future::Future<Output = Result<(), qc_engine::EngineError>>,
) {
    if let Err(error) = run.await {
        tracing::error!(queue = id, %error, "remote queue monitor stopped");
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(error) => {
                tracing::error!(%error, "cannot install SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
