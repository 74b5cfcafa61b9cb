use serde::{Deserialize, Serialize};

/// Wire envelope for published domain events (spec §3 `Event`, §6
/// "Event envelope (wire)"). `partition_key` is always the `payment_id`
/// so per-payment order is preserved on the bus (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: uuid::Uuid,
    pub event_type: EventType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub correlation_id: String,
    pub trace_id: String,
    pub partition_key: String,
    pub payload: serde_json::Value,
}

/// Known event types. Backward-compatible evolution is additive-fields
/// only; a breaking change gets a new variant/type rather than mutating
/// an existing one (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PaymentAuthorized,
    PaymentDeclined,
    PaymentFailed,
    PaymentCaptured,
    PaymentCancelled,
    PaymentSettled,
    RefundCompleted,
    RefundFailed,
    SettlementBatchCreated,
    SettlementBatchSettled,
    SettlementReconciliationAlert,
    DisputeOpened,
    DisputeLost,
    DisputeWon,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentAuthorized => "PAYMENT_AUTHORIZED",
            Self::PaymentDeclined => "PAYMENT_DECLINED",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::PaymentCaptured => "PAYMENT_CAPTURED",
            Self::PaymentCancelled => "PAYMENT_CANCELLED",
            Self::PaymentSettled => "PAYMENT_SETTLED",
            Self::RefundCompleted => "REFUND_COMPLETED",
            Self::RefundFailed => "REFUND_FAILED",
            Self::SettlementBatchCreated => "SETTLEMENT_BATCH_CREATED",
            Self::SettlementBatchSettled => "SETTLEMENT_BATCH_SETTLED",
            Self::SettlementReconciliationAlert => "SETTLEMENT_RECONCILIATION_ALERT",
            Self::DisputeOpened => "DISPUTE_OPENED",
            Self::DisputeLost => "DISPUTE_LOST",
            Self::DisputeWon => "DISPUTE_WON",
        }
    }
}

impl TryFrom<&str> for EventType {
    type Error = super::error::GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "PAYMENT_AUTHORIZED" => Ok(Self::PaymentAuthorized),
            "PAYMENT_DECLINED" => Ok(Self::PaymentDeclined),
            "PAYMENT_FAILED" => Ok(Self::PaymentFailed),
            "PAYMENT_CAPTURED" => Ok(Self::PaymentCaptured),
            "PAYMENT_CANCELLED" => Ok(Self::PaymentCancelled),
            "PAYMENT_SETTLED" => Ok(Self::PaymentSettled),
            "REFUND_COMPLETED" => Ok(Self::RefundCompleted),
            "REFUND_FAILED" => Ok(Self::RefundFailed),
            "SETTLEMENT_BATCH_CREATED" => Ok(Self::SettlementBatchCreated),
            "SETTLEMENT_BATCH_SETTLED" => Ok(Self::SettlementBatchSettled),
            "SETTLEMENT_RECONCILIATION_ALERT" => Ok(Self::SettlementReconciliationAlert),
            "DISPUTE_OPENED" => Ok(Self::DisputeOpened),
            "DISPUTE_LOST" => Ok(Self::DisputeLost),
            "DISPUTE_WON" => Ok(Self::DisputeWon),
            other => Err(super::error::GatewayError::Integrity(format!(
                "unknown event type on wire: {other}"
            ))),
        }
    }
}

impl Event {
    pub fn new(
        event_type: EventType,
        correlation_id: impl Into<String>,
        trace_id: impl Into<String>,
        partition_key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7(),
            event_type,
            timestamp: chrono::Utc::now(),
            correlation_id: correlation_id.into(),
            trace_id: trace_id.into(),
            partition_key: partition_key.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_str_roundtrip() {
        let types = [
            EventType::PaymentAuthorized,
            EventType::PaymentDeclined,
            EventType::PaymentFailed,
            EventType::PaymentCaptured,
            EventType::PaymentCancelled,
            EventType::PaymentSettled,
            EventType::RefundCompleted,
            EventType::RefundFailed,
            EventType::SettlementBatchCreated,
            EventType::SettlementBatchSettled,
            EventType::SettlementReconciliationAlert,
            EventType::DisputeOpened,
            EventType::DisputeLost,
            EventType::DisputeWon,
        ];
        for t in types {
            assert_eq!(EventType::try_from(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(EventType::try_from("NOT_A_REAL_EVENT").is_err());
    }
}
