//! Service-level error type shared by the operations layer and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Rendering error: {0}")]
    Render(String),
}

impl ServiceError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the message is safe to show to API callers as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::NotFound(_))
    }

    /// Message for API callers. Internal failures get a generic description.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Database(_) => {
                "An error occurred while accessing cities in the database.".to_string()
            }
            Self::Upstream(msg) => msg.clone(),
            Self::Render(_) => "An error occurred while rendering the response.".to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_are_hidden_from_callers() {
        let err = ServiceError::from(rusqlite::Error::InvalidQuery);
        assert!(!err.is_client_error());
        assert!(!err.public_message().contains("InvalidQuery"));
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = ServiceError::not_found("No cities found in the database.");
        assert!(err.is_client_error());
        assert_eq!(err.public_message(), "No cities found in the database.");
    }
}
