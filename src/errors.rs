use crate::{domain::DomainError, services::bucket_service::ServiceError};
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// An HTTP error rendered as a `{title, detail, status}` problem body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub title: String,
    pub message: String,
}

impl AppError {
    /// Create a new AppError whose title is the status' reason phrase.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        let title = status.canonical_reason().unwrap_or("Error");
        Self::with_title(status, title, msg)
    }

    pub fn with_title(status: StatusCode, title: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// 409 for a capacity violation.
    pub fn bucket_full(msg: impl Into<String>) -> Self {
        Self::with_title(StatusCode::CONFLICT, "Bucket Full Exception", msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "title": self.title,
            "detail": self.message,
            "status": self.status.as_u16()
        }));

        let mut response = (self.status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        response
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BucketNotFound(_) | ServiceError::ItemNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            ServiceError::Invalid { .. } => AppError::bad_request(err.to_string()),
            ServiceError::Domain(DomainError::BucketFull(_)) => {
                AppError::bucket_full(err.to_string())
            }
            ServiceError::Domain(other) => {
                tracing::error!("aggregate not loaded consistently: {}", other);
                AppError::internal("internal error")
            }
            ServiceError::Sqlx(other) => {
                tracing::error!("database error: {}", other);
                AppError::internal("internal error")
            }
        }
    }
}

/// Malformed bodies answer 400; a wrong content type or an oversized body
/// keeps axum's own status.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            status @ (StatusCode::UNSUPPORTED_MEDIA_TYPE | StatusCode::PAYLOAD_TOO_LARGE) => {
                AppError::new(status, rejection.body_text())
            }
            _ => AppError::bad_request(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_full_maps_to_conflict() {
        let err = AppError::from(ServiceError::Domain(DomainError::BucketFull(7)));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.title, "Bucket Full Exception");
        assert_eq!(err.message, "Bucket with id 7 is full.");
    }

    #[test]
    fn not_found_and_validation_are_distinct() {
        let missing = AppError::from(ServiceError::ItemNotFound(3));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.title, "Not Found");

        let invalid = AppError::from(ServiceError::Invalid {
            field: "size",
            reason: "must be non-negative".into(),
        });
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unparsable_query_is_a_bad_request() {
        use axum::extract::Query;
        use axum::http::Uri;
        use std::collections::HashMap;

        let uri: Uri = "/buckets?max-keys=-1".parse().unwrap();
        let rejection = Query::<HashMap<String, usize>>::try_from_uri(&uri).unwrap_err();
        let err = AppError::from(rejection);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.title, "Bad Request");
    }

    #[test]
    fn store_errors_hide_details() {
        let err = AppError::from(ServiceError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal error");
    }
}
