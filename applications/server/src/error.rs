/// Server error types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use segment_core::MembershipError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Engine error: {0}")]
    Engine(MembershipError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MembershipError> for ServerError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::NotFound { .. } => ServerError::NotFound(err.to_string()),
            MembershipError::DuplicateSlug(slug) => {
                ServerError::Conflict(format!("segment {slug} already exists"))
            }
            MembershipError::InvalidSegments(_) => {
                ServerError::BadRequest("invalid segments".to_string())
            }
            MembershipError::InvalidInput(msg) => ServerError::BadRequest(msg),
            MembershipError::Storage(_) => ServerError::Engine(err),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ServerError::Engine(ref e) => {
                tracing::error!("Engine error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (MembershipError::not_found("Segment", "beta"), StatusCode::NOT_FOUND),
            (MembershipError::DuplicateSlug("beta".into()), StatusCode::CONFLICT),
            (
                MembershipError::InvalidSegments(vec!["x".into()]),
                StatusCode::BAD_REQUEST,
            ),
            (MembershipError::invalid_input("bad month"), StatusCode::BAD_REQUEST),
            (
                MembershipError::storage("disk I/O error"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ServerError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn storage_failures_are_opaque() {
        let response =
            ServerError::from(MembershipError::storage("database is locked")).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["error"], "Internal server error");
    }
}
