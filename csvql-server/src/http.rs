//! The HTTP streaming endpoint (spec §4.9, §6): `axum` for routing and the
//! streaming response body, `tower-http` for request tracing, generalizing
//! the teacher's "wrap a protocol handler around a session context" shape
//! from the Postgres wire protocol to HTTP/JSON-over-NDJSON.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use chrono::NaiveDate;
use csvql_core::CellValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthManager;
use crate::error::ApiError;

pub struct AppState {
    pub engine: csvql_core::Engine,
    pub auth: AuthManager,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/connect", post(connect))
        .route("/auth/refresh", post(refresh))
        .route("/query/sql", post(query_sql))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ConnectForm {
    username: String,
    password: String,
    db: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
}

async fn connect(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ConnectForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !state.engine.catalog().has_database(&form.db) {
        return Err(ApiError::Engine(csvql_core::EngineError::validation(format!(
            "unknown database: {}",
            form.db
        ))));
    }
    let token = state.auth.issue(&form.username, &form.password)?;
    Ok(Json(TokenResponse { access_token: token }))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Auth(crate::auth::AuthError::InvalidToken))?;
    let refreshed = state.auth.refresh(token)?;
    Ok(Json(TokenResponse { access_token: refreshed }))
}

#[derive(Debug, Deserialize)]
struct SqlRequest {
    sql: String,
    db: String,
}

async fn query_sql(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SqlRequest>,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    state
        .auth
        .principal_of(token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let mut rows = state.engine.execute(&request.db, &request.sql)?;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(4);
    tokio::task::spawn_blocking(move || {
        const BATCH_SIZE: usize = 1024;
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        loop {
            match rows.next() {
                Some(Ok(row)) => {
                    batch.push(row_to_json(&row));
                    if batch.len() == BATCH_SIZE {
                        if tx.blocking_send(Ok(flush(&mut batch))).is_err() {
                            return;
                        }
                    }
                }
                Some(Err(err)) => {
                    // Mid-stream DataAccessError (spec §4.9 point 5, §7): the
                    // body ends here without a trailing batch, and the pending
                    // one is discarded rather than flushed.
                    log::warn!("aborting query_sql stream: {err}");
                    let _ = tx.blocking_send(Err(std::io::Error::other(err.to_string())));
                    return;
                }
                None => {
                    if !batch.is_empty() {
                        let _ = tx.blocking_send(Ok(flush(&mut batch)));
                    }
                    return;
                }
            }
        }
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/x-ndjson"),
    );
    Ok(response)
}

fn flush(batch: &mut Vec<Value>) -> Bytes {
    let line = serde_json::to_string(&Value::Array(std::mem::take(batch))).unwrap_or_default();
    Bytes::from(format!("{line}\n"))
}

fn row_to_json(row: &csvql_core::Row) -> Value {
    Value::Array(row.iter().map(cell_to_json).collect())
}

fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Integer(i) => Value::from(*i),
        CellValue::Float(f) => Value::from(*f),
        CellValue::Boolean(b) => Value::from(*b),
        CellValue::String(s) => Value::from(s.clone()),
        CellValue::Date(d) => Value::from(format_date(d)),
        CellValue::Null => Value::Null,
    }
}

fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
