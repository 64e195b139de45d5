use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::ApiError, server::AppState};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "access_token";

/// Rejects requests whose `access_token` header does not match the configured key.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    let header_present = provided.is_some();
    let authorized = provided == Some(state.api_key.as_ref());

    if authorized {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        path = %request.uri().path(),
        header_present,
        "Rejected request with invalid API key"
    );
    Err(ApiError::Forbidden)
}
