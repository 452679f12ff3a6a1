//! API handlers

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::extract::Authenticated;
use crate::api::AppState;
use crate::config::DATABASE_NAME;
use crate::items::{self, ITEMS_COLLECTION};
use crate::Error;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn with_status(status: StatusCode, error: impl Into<String>) -> ApiError {
        (
            status,
            Json(ErrorResponse {
                error: error.into(),
            }),
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DbCheckResponse {
    pub status: String,
    pub host: Option<String>,
    pub user: Option<String>,
    pub database: String,
    pub connected: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Provider model id; the configured default when omitted
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompletionResponse {
    pub completion: String,
}

/// Health check
#[utoipa::path(get, path = "/", responses((status = 200, description = "Greeting", body = MessageResponse)))]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello from the Rust backend! Dockerized and Ready.".to_string(),
    })
}

/// List every item
#[utoipa::path(
    get,
    path = "/items",
    responses(
        (status = 200, description = "Items, or a not-connected error object", body = items::ItemList),
        (status = 500, description = "Store or provider failure", body = ErrorResponse),
    )
)]
pub async fn list_items(State(state): State<AppState>) -> Response {
    items_response(&state).await
}

/// List every item; requires an authenticated caller
#[utoipa::path(
    get,
    path = "/secure-items",
    responses(
        (status = 200, description = "Items, or a not-connected error object", body = items::ItemList),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Store or provider failure", body = ErrorResponse),
    )
)]
pub async fn list_secure_items(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> Response {
    tracing::debug!(user = identity.as_str(), "Serving secure items");
    items_response(&state).await
}

async fn items_response(state: &AppState) -> Response {
    match items::list_all(state.store(), ITEMS_COLLECTION).await {
        Ok(list) => Json(list).into_response(),
        // Degraded mode is reported in-band, not as a server error
        Err(Error::NotConnected) => Json(ErrorResponse {
            error: Error::NotConnected.to_string(),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, collection = ITEMS_COLLECTION, "Failed to list items");
            ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                .into_response()
        }
    }
}

/// Report database configuration
#[utoipa::path(get, path = "/db-check", responses((status = 200, description = "Configured database settings", body = DbCheckResponse)))]
pub async fn db_check(State(state): State<AppState>) -> Json<DbCheckResponse> {
    Json(DbCheckResponse {
        status: "DB config loaded".to_string(),
        host: state.diagnostics.host.clone(),
        user: state.diagnostics.user.clone(),
        database: DATABASE_NAME.to_string(),
        connected: state.store.is_some(),
    })
}

/// Forward a prompt and return the full completion
#[utoipa::path(
    post,
    path = "/completions",
    request_body = CompletionRequest,
    responses(
        (status = 200, description = "Full completion text", body = CompletionResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Store or provider failure", body = ErrorResponse),
        (status = 503, description = "No inference provider configured", body = ErrorResponse),
    )
)]
pub async fn create_completion(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Json(payload): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let client = state.completions.as_ref().ok_or_else(not_configured)?;
    let model = payload.model.as_deref().unwrap_or(client.default_model());

    tracing::debug!(user = identity.as_str(), model, "Completion requested");

    let completion = client
        .complete(&payload.prompt, model)
        .await
        .map_err(provider_error)?;

    Ok(Json(CompletionResponse { completion }))
}

/// Forward a prompt and stream the completion as plain text
#[utoipa::path(
    post,
    path = "/completions/stream",
    request_body = CompletionRequest,
    responses(
        (status = 200, description = "Chunked completion fragments", body = String, content_type = "text/plain"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Store or provider failure", body = ErrorResponse),
        (status = 503, description = "No inference provider configured", body = ErrorResponse),
    )
)]
pub async fn stream_completion(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Json(payload): Json<CompletionRequest>,
) -> Result<Response, ApiError> {
    let client = state.completions.as_ref().ok_or_else(not_configured)?;
    let model = payload.model.as_deref().unwrap_or(client.default_model());

    tracing::debug!(user = identity.as_str(), model, "Streaming completion requested");

    let fragments = client
        .complete_stream(&payload.prompt, model)
        .await
        .map_err(provider_error)?
        .inspect_err(|err| tracing::warn!(error = %err, "Completion stream aborted"));

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragments),
    )
        .into_response())
}

fn not_configured() -> ApiError {
    ErrorResponse::with_status(StatusCode::SERVICE_UNAVAILABLE, "Completions not configured")
}

fn provider_error(err: Error) -> ApiError {
    tracing::error!(error = %err, "Completion provider failure");
    ErrorResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
