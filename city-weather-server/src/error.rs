use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use city_weather_core::ServiceError;
use serde_json::json;

/// Error returned by handlers and middleware, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Forbidden,
    Service(ServiceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Service(err) => match err {
                ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Database(_) | ServiceError::Upstream(_) | ServiceError::Render(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Forbidden => "Could not validate API KEY".to_string(),
            ApiError::Service(err) => err.public_message(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Service(ServiceError::invalid_request(rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Service(ServiceError::invalid_request(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Service(err) = &self {
            if status.is_server_error() {
                tracing::error!(error = %err, "Request failed");
            } else {
                tracing::debug!(error = %err, %status, "Request rejected");
            }
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
