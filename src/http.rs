//! HTTP transport for the boundary operations.
//!
//! | Method | Path | Body / query |
//! |--------|------|--------------|
//! | `GET` | `/semantic_search` | `?q=...[&threshold=..][&limit=..]` |
//! | `POST` | `/add_note_embedding` | `{note_id, title, content}` |
//! | `POST` | `/update_note_embedding` | `{note_id, title, content}` |
//! | `POST` | `/remove_note_embedding` | `{note_id}` |
//! | `GET` | `/health` | |
//!
//! The index is synchronous, so every handler runs it on the blocking pool.

use crate::api::{
    self, AddRequest, ApiError, ApiResult, ErrorKind, MSG_NOTE_FIELDS_REQUIRED,
    MSG_NOTE_ID_REQUIRED, MutationResponse, RemoveRequest, SearchQuery, UpdateRequest,
};
use crate::index::NoteIndex;
use crate::{Error, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the router over a shared index.
pub fn router(index: Arc<NoteIndex>) -> Router {
    Router::new()
        .route("/semantic_search", get(semantic_search))
        .route("/add_note_embedding", post(add_note_embedding))
        .route("/update_note_embedding", post(update_note_embedding))
        .route("/remove_note_embedding", post(remove_note_embedding))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(index)
}

/// Serves the router on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(index: Arc<NoteIndex>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::operation("bind", format!("{addr}: {e}")))?;
    tracing::info!(addr, "Starting HTTP server");

    axum::serve(listener, router(index))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::operation("serve", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down HTTP server");
}

async fn semantic_search(
    State(index): State<Arc<NoteIndex>>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => run(index, move |index| api::semantic_search(index, &query)).await,
        Err(rejection) => failure(&ApiError::validation(rejection.body_text())),
    }
}

async fn add_note_embedding(
    State(index): State<Arc<NoteIndex>>,
    body: std::result::Result<Json<AddRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(request)) => run(index, move |index| api::add_note_embedding(index, &request)).await,
        Err(rejection) => rejected(&rejection, MSG_NOTE_FIELDS_REQUIRED),
    }
}

async fn update_note_embedding(
    State(index): State<Arc<NoteIndex>>,
    body: std::result::Result<Json<UpdateRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(request)) => {
            run(index, move |index| api::update_note_embedding(index, &request)).await
        },
        Err(rejection) => rejected(&rejection, MSG_NOTE_FIELDS_REQUIRED),
    }
}

async fn remove_note_embedding(
    State(index): State<Arc<NoteIndex>>,
    body: std::result::Result<Json<RemoveRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(request)) => {
            run(index, move |index| api::remove_note_embedding(index, &request)).await
        },
        Err(rejection) => rejected(&rejection, MSG_NOTE_ID_REQUIRED),
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    cached: usize,
}

async fn health(State(index): State<Arc<NoteIndex>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        cached: index.cache().len(),
    })
}

/// Runs a boundary operation on the blocking pool.
async fn run<T, F>(index: Arc<NoteIndex>, op: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&NoteIndex) -> ApiResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || op(&index)).await {
        Ok(Ok(body)) => (StatusCode::OK, Json(body)).into_response(),
        Ok(Err(err)) => failure(&err),
        Err(join_error) => {
            tracing::error!(error = %join_error, "Request handler panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MutationResponse::failure("Internal server error")),
            )
                .into_response()
        },
    }
}

fn rejected(rejection: &JsonRejection, message: &str) -> Response {
    tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
    failure(&ApiError::validation(message))
}

fn failure(err: &ApiError) -> Response {
    let status = match err.kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err.response())).into_response()
}
