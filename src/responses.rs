use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Bodies for responses that do not come from a handler error. Failures use
/// the same `{success, error, code, retryable}` fields as `AppError`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub retryable: bool,
}

impl JsonResponse {
    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                success: true,
                message: Some(msg.to_string()),
                error: None,
                code: None,
                retryable: false,
            }),
        )
    }

    /// Rate limiter rejection; clients may retry after backing off.
    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(JsonResponse {
                success: false,
                message: None,
                error: Some(msg.to_string()),
                code: Some("rate_limited".to_string()),
                retryable: true,
            }),
        )
    }
}
