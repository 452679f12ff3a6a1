//! Request extractors backed by the access gate

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::AppState;
use crate::auth::{AuthError, Identity};

/// Identity produced by the access gate
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Undecodable header bytes count as a bad scheme when the gate is on
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());

        match state.gate.authenticate(header).await {
            Ok(identity) => Ok(CurrentUser(identity)),
            Err(err) => {
                tracing::warn!(reason = ?err, path = %parts.uri.path(), "Request rejected by access gate");
                Err(err)
            }
        }
    }
}

/// Identity that also passed the protected-route precondition
pub struct Authenticated(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        state.gate.require_auth(&identity)?;
        Ok(Authenticated(identity))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}
