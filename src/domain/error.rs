use thiserror::Error;

/// Error taxonomy for the orchestration plane (spec §7).
///
/// Each variant maps to exactly one propagation rule: validation and
/// idempotency-conflict errors are surfaced verbatim and never retried;
/// business declines surface after a terminal state transition; transient
/// errors are retried/failed-over before ever reaching a caller; integrity
/// failures never self-heal.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("authentication/authorization: {0}")]
    Unauthorized(String),

    #[error("idempotency conflict: {0}")]
    IdempotencyConflict(String),

    #[error("idempotency store busy, retry later")]
    IdempotencyBusy,

    #[error("business decline: {reason}")]
    BusinessDecline { reason: String },

    #[error("transient dependency failure: {0}")]
    Transient(String),

    #[error("integrity failure: {0}")]
    Integrity(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("webhook signature: {0}")]
    WebhookSignature(String),

    #[error("internal error (trace_id={trace_id}): {source}")]
    Internal {
        trace_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::IdempotencyConflict(_) => "idempotency_conflict",
            Self::IdempotencyBusy => "throttled",
            Self::BusinessDecline { .. } => "business_decline",
            Self::Transient(_) => "transient_error",
            Self::Integrity(_) => "integrity_error",
            Self::NotFound(_) => "not_found",
            Self::WebhookSignature(_) => "webhook_error",
            Self::Internal { .. } => "internal_error",
            Self::Database(_) => "internal_error",
            Self::Serialization(_) => "internal_error",
        }
    }

    /// Transient errors are the only class the retry engine (§4.5) acts on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Database(_))
    }
}
