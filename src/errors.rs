use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::error;

use crate::models::ErrorResponse;

pub(crate) const MISSING_QUERY_MESSAGE: &str = "Query is required";
pub(crate) const INVALID_BODY_MESSAGE: &str = "Invalid JSON body";
pub(crate) const DOWNSTREAM_FAILURE_MESSAGE: &str = "Failed to get response from AI server";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("request body is not valid JSON")]
    InvalidBody,

    #[error("request is missing a query")]
    MissingQuery,

    #[error("downstream unreachable: {0}")]
    DownstreamUnavailable(String),

    #[error("downstream responded with status {0}")]
    DownstreamStatus(StatusCode),

    #[error("downstream did not respond within {0:?}")]
    DownstreamTimeout(Duration),

    #[error("failed to read downstream response body: {0}")]
    DownstreamBody(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidBody | RelayError::MissingQuery => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the caller. Downstream failures never leak their cause.
    fn public_message(&self) -> &'static str {
        match self {
            RelayError::InvalidBody => INVALID_BODY_MESSAGE,
            RelayError::MissingQuery => MISSING_QUERY_MESSAGE,
            _ => DOWNSTREAM_FAILURE_MESSAGE,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Error communicating with AI server: {}", self);
        }
        let body = ErrorResponse {
            error: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: RelayError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_are_400() {
        let (status, body) = body_of(RelayError::MissingQuery).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Query is required");

        let (status, body) = body_of(RelayError::InvalidBody).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid JSON body");
    }

    #[tokio::test]
    async fn test_downstream_errors_hide_their_cause() {
        for err in [
            RelayError::DownstreamUnavailable("connection refused".into()),
            RelayError::DownstreamStatus(StatusCode::SERVICE_UNAVAILABLE),
            RelayError::DownstreamTimeout(Duration::from_secs(30)),
            RelayError::DownstreamBody("unexpected eof".into()),
        ] {
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body.error, "Failed to get response from AI server");
        }
    }
}
