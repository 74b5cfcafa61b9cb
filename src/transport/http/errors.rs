//! HTTP status mapping for [`GatewayError`] (spec §6 status contract),
//! grounded in the teacher's `adapters::api_errors::ApiError` newtype
//! pattern: one `IntoResponse` impl, one place that decides what a
//! caller is allowed to see.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::domain::error::GatewayError;

/// Newtype so we can implement `IntoResponse` for a foreign error type,
/// same as the teacher's `ApiError(pub PipelineError)`.
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let trace_id = uuid::Uuid::now_v7().to_string();

        let (status, message, retry_after) = match &self.0 {
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            GatewayError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            GatewayError::IdempotencyConflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            GatewayError::IdempotencyBusy => {
                (StatusCode::TOO_MANY_REQUESTS, "request already in flight, retry shortly".to_string(), Some(1))
            }
            GatewayError::BusinessDecline { reason } => (StatusCode::UNPROCESSABLE_ENTITY, reason.clone(), None),
            GatewayError::Transient(msg) => {
                tracing::warn!(error = %msg, "transient failure surfaced to caller");
                (StatusCode::SERVICE_UNAVAILABLE, "upstream temporarily unavailable".to_string(), Some(5))
            }
            GatewayError::Integrity(msg) => {
                tracing::error!(error = %msg, "integrity failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), None)
            }
            GatewayError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            GatewayError::WebhookSignature(_) => {
                (StatusCode::BAD_REQUEST, "invalid webhook signature".to_string(), None)
            }
            GatewayError::Internal { source, .. } => {
                tracing::error!(error = %source, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), None)
            }
            GatewayError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), None)
            }
            GatewayError::Serialization(err) => {
                tracing::error!(error = %err, "serialization error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), None)
            }
        };

        let body = serde_json::json!({
            "code": self.0.code(),
            "message": message,
            "trace_id": trace_id,
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                axum::http::HeaderValue::from_str(&seconds.to_string()).expect("digits are valid header value"),
            );
        }
        response
    }
}
