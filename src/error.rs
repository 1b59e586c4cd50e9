use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::gemini::CompletionError;

/// Failures of the completion gateway, each mapped to a plain-text response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Messages are required")]
    MalformedRequest,
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedRequest => StatusCode::BAD_REQUEST,
            GatewayError::Completion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the caller. Remote failure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Completion(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::MalformedRequest.status(), StatusCode::BAD_REQUEST);
        let remote = GatewayError::from(CompletionError::EmptyResponse);
        assert_eq!(remote.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_remote_details_are_not_exposed() {
        let remote = GatewayError::from(CompletionError::EmptyResponse);
        assert_eq!(remote.public_message(), "Internal error");
        assert_eq!(GatewayError::MalformedRequest.public_message(), "Messages are required");
    }
}
