// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("{0}")]
    AuthRejected(String),

    #[error("invalid jobid")]
    InvalidJob,

    #[error("job not completed")]
    JobNotCompleted,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Engine(#[from] qc_engine::EngineError),

    #[error("authentication service unreachable: {0}")]
    AuthService(#[from] reqwest::Error),
}
