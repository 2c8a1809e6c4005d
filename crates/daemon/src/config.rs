// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor daemon configuration.

use qc_engine::{SolverPaths, SshConfig};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub bus: BusConfig,
    #[serde(default, rename = "backend")]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct BusConfig {
    pub url: String,
}

/// One `[[backend]]` table: the queue id, the polling period, and the
/// connector-variant settings.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    #[serde(default = "default_update_period")]
    pub update_period_secs: u64,
    #[serde(flatten)]
    pub kind: BackendKind,
}

fn default_update_period() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendKind {
    /// Child processes forked on this host.
    Local {
        solver_dir: PathBuf,
        maxjobs: usize,
        #[serde(default = "default_time_limit")]
        time_limit_secs: u64,
        #[serde(default = "default_mem_limit")]
        mem_limit_mb: u64,
    },
    /// A workload manager whose client lives on this host.
    Slurm {
        bin_dir: PathBuf,
        user: String,
        maxjobs: usize,
        #[serde(default)]
        solver: SolverPaths,
    },
    /// A workload manager on a remote host, over secure shell.
    Ssh(SshConfig),
}

fn default_time_limit() -> u64 {
    3600
}

fn default_mem_limit() -> u64 {
    2048
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
