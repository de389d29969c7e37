use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::store::StoreError;

/// Seconds clients are asked to wait after a store outage.
pub const RETRY_AFTER_SECS: u64 = 30;

/// Failures of a gateway or resolver call.
///
/// "No record in that language" is not in here: it is a normal
/// resolution outcome.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for LookupError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            LookupError::StoreUnavailable(err.to_string())
        } else {
            LookupError::Internal(err.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {detail}")]
    Internal { detail: String, expose: bool },
}

impl ApiError {
    /// Map a lookup failure. With `production` set, internal details are
    /// logged but not sent to the client.
    pub fn from_lookup(err: LookupError, production: bool) -> Self {
        match err {
            LookupError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            LookupError::StoreUnavailable(msg) => ApiError::StoreUnavailable(msg),
            LookupError::NotFound(msg) => ApiError::NotFound(msg),
            LookupError::Internal(detail) => ApiError::Internal {
                detail,
                expose: !production,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", detail.clone())
            }
            ApiError::StoreUnavailable(detail) => {
                tracing::warn!(detail, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    format!(
                        "Disease store is unavailable. Retry after {}s",
                        RETRY_AFTER_SECS
                    ),
                )
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Internal { detail, expose } => {
                tracing::error!(detail, "API internal error");
                let message = if *expose {
                    detail.clone()
                } else {
                    "An internal error occurred".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
            }
        };

        let body = ErrorBody {
            success: false,
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, ApiError::StoreUnavailable(_)) {
            response.headers_mut().insert(
                "Retry-After",
                HeaderValue::from(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn invalid_request_returns_400() {
        let response = ApiError::from_lookup(
            LookupError::InvalidRequest("query is required".into()),
            true,
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
        assert_eq!(json["error"]["message"], "query is required");
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn store_unavailable_returns_503_with_retry_after() {
        let err: LookupError = StoreError::Timeout(Duration::from_secs(1)).into();
        let response = ApiError::from_lookup(err, true).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "30");
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn internal_detail_hidden_in_production() {
        let response = ApiError::from_lookup(LookupError::Internal("cursor died".into()), true)
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn internal_detail_shown_in_development() {
        let response = ApiError::from_lookup(LookupError::Internal("cursor died".into()), false)
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "cursor died");
    }

    #[test]
    fn backend_errors_are_internal() {
        let err: LookupError = StoreError::Backend("bad filter".into()).into();
        assert!(matches!(err, LookupError::Internal(_)));
    }
}
