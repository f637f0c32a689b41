use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use privmatch_core::Error;
use serde_json::json;

/// Core error rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateId(_) => StatusCode::CONFLICT,
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privmatch_core::EntityId;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError(Error::NotFound(EntityId::new())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError(Error::DuplicateId(EntityId::new())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError(Error::InvalidFilter("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(Error::EmptyVector).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(Error::WalCorrupted("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
