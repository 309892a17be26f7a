//! JSON envelope shared by every endpoint: `{data, meta}` on success,
//! `{error, meta}` on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

/// API version reported in every envelope.
pub const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            version: API_VERSION,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Successful response: `{ "data": T, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Response {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Response {
        let meta = ResponseMeta::default();
        (status, axum::Json(Self { data, meta })).into_response()
    }
}

/// Error detail inside [`ApiErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// `{ "error": { "code": "...", "message": "..." }, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn respond(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
        let error = ErrorDetail {
            code: code.to_string(),
            message: message.into(),
        };
        let meta = ResponseMeta::default();
        (status, axum::Json(Self { error, meta })).into_response()
    }

    pub fn not_found(message: impl Into<String>) -> Response {
        Self::respond(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Malformed request body or parameters.
    pub fn bad_request(message: impl Into<String>) -> Response {
        Self::respond(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"running": false}));
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["data"]["running"], false);
        assert_eq!(v["meta"]["version"], "1");
        assert!(v["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_created_keeps_envelope() {
        let resp = ApiResponse::created(serde_json::json!({"sensor": "mpu"}));
        assert_eq!(resp.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["data"]["sensor"], "mpu");
        assert_eq!(v["meta"]["service"], "flowsim");
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = ApiErrorResponse::bad_request("delta must be a number");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["code"], "BAD_REQUEST");
        assert_eq!(v["error"]["message"], "delta must be a number");
    }
}
