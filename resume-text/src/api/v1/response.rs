//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint returns an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },       // present on success, absent on error
//!   "error": { "code": "payload_too_large", "message": "..." }  // present on error
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ResumeError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
/// Each variant maps to a fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed multipart body or missing fields. HTTP 400.
    InvalidRequest,
    /// The upload exceeds the configured size limit. HTTP 413.
    PayloadTooLarge,
    /// Too many requests against an upstream dependency. HTTP 429.
    RateLimited,
    /// An unexpected server-side error occurred. Internal details are never
    /// leaked to the client. HTTP 500.
    InternalError,
    /// A required backend (OCR, LLM) is not configured. HTTP 503.
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::PayloadTooLarge => write!(f, "payload_too_large"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

/// Canonical v1 API response envelope.
///
/// On success, `data` is present and `error` is absent. On error, `error`
/// is present and `data` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<ResumeError> for ApiResponse<T> {
    /// Convert a [`ResumeError`] into a v1 [`ApiResponse`].
    ///
    /// Internal error details are **never** leaked to the client; they are
    /// logged via `tracing::error!` instead.
    fn from(err: ResumeError) -> Self {
        match err {
            ResumeError::FileTooLarge { .. } => {
                ApiResponse::error(ErrorCode::PayloadTooLarge, err.to_string())
            }

            ResumeError::Validation(ref msg) | ResumeError::Multipart(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            ResumeError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            ResumeError::LlmRateLimit { retry_after } => {
                let msg = match retry_after {
                    Some(secs) => format!("Rate limit exceeded, retry after {secs} seconds"),
                    None => "Rate limit exceeded".to_string(),
                };
                ApiResponse::error(ErrorCode::RateLimited, msg)
            }

            ResumeError::OcrUnavailable(ref msg) | ResumeError::LlmUnavailable(ref msg) => {
                ApiResponse::error(ErrorCode::ServiceUnavailable, msg.clone())
            }

            ref internal @ (ResumeError::BinaryDataDetected
            | ResumeError::Read(_)
            | ResumeError::Conversion(_)
            | ResumeError::InsufficientText { .. }
            | ResumeError::Ocr(_)
            | ResumeError::OcrCancelled
            | ResumeError::Llm(_)
            | ResumeError::Io(_)
            | ResumeError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_serializes_without_error() {
        let resp = ApiResponse::success("hello");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], "hello");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_response_serializes_without_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::InvalidRequest, "missing file");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "missing file");
    }

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ErrorCode::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::ServiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_code_serializes_snake_case() {
        let json = serde_json::to_value(&ErrorCode::PayloadTooLarge).expect("serialize");
        assert_eq!(json, "payload_too_large");
        assert_eq!(ErrorCode::ServiceUnavailable.to_string(), "service_unavailable");
    }

    #[test]
    fn file_too_large_maps_to_payload_too_large() {
        let resp: ApiResponse<()> = ResumeError::FileTooLarge {
            size: 11,
            limit: 10,
        }
        .into();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(resp.error.unwrap().code, ErrorCode::PayloadTooLarge);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let resp: ApiResponse<()> = ResumeError::Internal("db password=hunter2".into()).into();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = resp.error.unwrap();
        assert!(!err.message.contains("hunter2"));
    }
}
