//! HTTP surface over the stored burn records and the job runner

use crate::burn::BurnRecord;
use crate::config::TokenTable;
use crate::error::Error;
use crate::scheduler::JobRunner;
use crate::store::BurnStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<JobRunner>,
    pub store: Arc<dyn BurnStore>,
    pub tokens: Arc<TokenTable>,
}

/// Handler errors, rendered as `{"error": ...}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Burn data not yet available")]
    NoData,

    #[error("Job already running")]
    JobRunning,

    #[error("{0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::RunRejected => ApiError::JobRunning,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NoData => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::JobRunning => StatusCode::CONFLICT,
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenBurnResponse {
    token: String,
    data: BurnRecord,
    age_seconds: i64,
    stale: bool,
}

/// A stored record with its freshness, as listed by `/burn-data`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedRecord {
    #[serde(flatten)]
    record: BurnRecord,
    age_seconds: i64,
    stale: bool,
}

#[derive(Debug, Serialize)]
struct TokenEntry {
    symbol: String,
    address: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/burn-data", get(all_burn_data))
        .route("/burn-data/:token", get(token_burn_data))
        .route("/status", get(status))
        .route("/tokens", get(tokens))
        .route("/trigger-job", post(trigger_job))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn all_burn_data(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, CachedRecord>>> {
    let records = state.store.all().await?;
    if records.is_empty() {
        return Err(ApiError::NoData);
    }

    let now = Utc::now();
    Ok(Json(
        records
            .into_iter()
            .map(|(symbol, record)| {
                let cached = CachedRecord {
                    age_seconds: record.age_seconds(now),
                    stale: record.is_stale(now),
                    record,
                };
                (symbol, cached)
            })
            .collect(),
    ))
}

async fn token_burn_data(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<TokenBurnResponse>> {
    let symbol = token.to_lowercase();
    if state.tokens.get(&symbol).is_none() {
        return Err(ApiError::NotFound(format!("Unknown token: {}", token)));
    }

    let record = state
        .store
        .get(&symbol)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No burn data for {}", token)))?;

    let now = Utc::now();
    Ok(Json(TokenBurnResponse {
        token: symbol,
        age_seconds: record.age_seconds(now),
        stale: record.is_stale(now),
        data: record,
    }))
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let records = state.store.all().await?;
    Ok(Json(json!({
        "job": state.runner.status(),
        "tokens": state.tokens.len(),
        "records": records.len(),
        "endpoints": state.runner.fleet().pool().health(),
        "timestamp": Utc::now(),
    })))
}

async fn tokens(State(state): State<AppState>) -> Json<Vec<TokenEntry>> {
    Json(
        state
            .tokens
            .tokens()
            .into_iter()
            .map(|t| TokenEntry {
                symbol: t.symbol,
                address: t.address.to_checksum(None),
            })
            .collect(),
    )
}

async fn trigger_job(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.runner.trigger()?;
    tracing::info!("Burn job triggered over HTTP");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Job started" })),
    ))
}
