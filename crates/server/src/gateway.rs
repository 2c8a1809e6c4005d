// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway routes: submit, delete, status, list, download, register.

use crate::auth_client::AuthClient;
use crate::error::GatewayError;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use qc_core::{JobId, JobRecord, JobStatus};
use qc_engine::JobManager;
use qc_wire::{MessageBus, StateStore};
use std::collections::HashMap;
use std::sync::Arc;

pub struct GatewayState<S, B> {
    pub manager: JobManager<S, B>,
    pub auth: AuthClient,
}

pub fn router<S, B>(state: GatewayState<S, B>) -> Router
where
    S: StateStore + 'static,
    B: MessageBus + 'static,
{
    Router::new()
        .route("/register", get(register))
        .route("/submit", post(submit))
        .route("/delete", post(delete))
        .route("/status", get(status))
        .route("/list", get(list))
        .route("/download", get(download))
        .with_state(Arc::new(state))
}

type Args = Query<HashMap<String, String>>;

fn ok_response(pairs: &[(&str, &str)], body: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    set_header(&mut headers, "Qcloud-Server-Status", "OK");
    for (name, value) in pairs {
        set_header(&mut headers, name, value);
    }
    (headers, body).into_response()
}

fn error_response(error: &GatewayError) -> Response {
    tracing::warn!(%error, "request failed");
    let mut headers = HeaderMap::new();
    set_header(&mut headers, "Qcloud-Server-Message", &error.to_string());
    (headers, ()).into_response()
}

fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let Ok(name) = HeaderName::try_from(name.to_string()) else {
        return;
    };
    if let Ok(value) = HeaderValue::try_from(value) {
        headers.insert(name, value);
    }
}

fn token(headers: &HeaderMap) -> Result<&str, GatewayError> {
    headers
        .get("Qcloud-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::MissingArgument("Qcloud-Token"))
}

fn jobid(args: &HashMap<String, String>) -> Result<JobId, GatewayError> {
    args.get("jobid")
        .map(|id| JobId::new(id.clone()))
        .ok_or(GatewayError::MissingArgument("jobid"))
}

/// Wire form of a status: `DNE` surfaces as `INVALID`.
fn wire_status(record: &JobRecord) -> String {
    if record.is_valid() {
        record.status.to_string()
    } else {
        "INVALID".to_string()
    }
}

/// Validate the caller and fetch the addressed job.
async fn authorized_job<S: StateStore, B: MessageBus>(
    state: &GatewayState<S, B>,
    headers: &HeaderMap,
    args: &HashMap<String, String>,
) -> Result<JobRecord, GatewayError> {
    state.auth.validate(token(headers)?).await?;
    let jobid = jobid(args)?;
    Ok(state.manager.get(&jobid).await?)
}

async fn register<S: StateStore, B: MessageBus>(
    State(state): State<Arc<GatewayState<S, B>>>,
) -> Response {
    match state.auth.register().await {
        Ok((userid, token)) => {
            tracing::info!(userid, "user registered");
            ok_response(&[("Qcloud-Token", token.as_str())], Vec::new())
        }
        Err(error) => error_response(&error),
    }
}

async fn submit<S: StateStore, B: MessageBus>(
    State(state): State<Arc<GatewayState<S, B>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = async {
        let userid = state.auth.validate(token(&headers)?).await?;
        let input = String::from_utf8_lossy(&body).into_owned();
        let record = state.manager.submit(&input).await?;
        tracing::info!(jobid = %record.jobid, userid, "job submitted");
        Ok(record)
    }
    .await;
    match result {
        Ok(record) => ok_response(
            &[("Qcloud-Server-Jobid", record.jobid.as_str())],
            Vec::new(),
        ),
        Err(error) => error_response(&error),
    }
}

async fn delete<S: StateStore, B: MessageBus>(
    State(state): State<Arc<GatewayState<S, B>>>,
    headers: HeaderMap,
    Query(args): Args,
) -> Response {
    let result = async {
        let record = authorized_job(&state, &headers, &args).await?;
        if !record.is_valid() {
            return Err(GatewayError::InvalidJob);
        }
        state.manager.delete(&record.jobid).await?;
        tracing::info!(jobid = %record.jobid, "job deleted");
        Ok(record.jobid)
    }
    .await;
    match result {
        Ok(jobid) => ok_response(&[("Qcloud-Server-Jobid", jobid.as_str())], Vec::new()),
        Err(error) => error_response(&error),
    }
}

async fn status<S: StateStore, B: MessageBus>(
    State(state): State<Arc<GatewayState<S, B>>>,
    headers: HeaderMap,
    Query(args): Args,
) -> Response {
    match authorized_job(&state, &headers, &args).await {
        Ok(record) => {
            tracing::info!(jobid = %record.jobid, status = %wire_status(&record), "status");
            ok_response(
                &[
                    ("Qcloud-Server-Jobid", record.jobid.as_str()),
                    ("Qcloud-Server-Jobstatus", &wire_status(&record)),
                ],
                Vec::new(),
            )
        }
        Err(error) => error_response(&error),
    }
}

async fn list<S: StateStore, B: MessageBus>(
    State(state): State<Arc<GatewayState<S, B>>>,
    headers: HeaderMap,
    Query(args): Args,
) -> Response {
    let result = async {
        let record = authorized_job(&state, &headers, &args).await?;
        if !record.is_valid() {
            return Err(GatewayError::InvalidJob);
        }
        if record.status != JobStatus::Done {
            return Err(GatewayError::JobNotCompleted);
        }
        let mut body = String::new();
        for file in &record.files {
            body.push_str(file);
            body.push('\n');
        }
        Ok((record.jobid, body))
    }
    .await;
    match result {
        Ok((jobid, body)) => ok_response(
            &[("Qcloud-Server-Jobid", jobid.as_str())],
            body.into_bytes(),
        ),
        Err(error) => error_response(&error),
    }
}

async fn download<S: StateStore, B: MessageBus>(
    State(state): State<Arc<GatewayState<S, B>>>,
    headers: HeaderMap,
    Query(args): Args,
) -> Response {
    let result = async {
        let record = authorized_job(&state, &headers, &args).await?;
        if !record.is_valid() {
            return Err(GatewayError::InvalidJob);
        }
        let name = args
            .get("file")
            .ok_or(GatewayError::MissingArgument("file"))?;
        if name.contains('/') || name.contains("..") {
            return Err(GatewayError::FileNotFound(name.clone()));
        }
        let data = state
            .manager
            .get_file(&record.jobid, name)
            .await?
            .ok_or_else(|| GatewayError::FileNotFound(name.clone()))?;
        tracing::info!(jobid = %record.jobid, file = name.as_str(), "file downloaded");
        Ok((record.jobid, data))
    }
    .await;
    match result {
        Ok((jobid, data)) => ok_response(&[("Qcloud-Server-Jobid", jobid.as_str())], data),
        Err(error) => error_response(&error),
    }
}
