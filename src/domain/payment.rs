use {
    super::audit::NewAuditEntry,
    super::card::CardBrand,
    super::error::GatewayError,
    super::id::{CorrelationId, ExternalId, MerchantId, PaymentId},
    super::money::Money,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Payment lifecycle status (spec §4.1 state machine):
///
/// ```text
///            ┌──────→ DECLINED (terminal)
/// PENDING ──┤
///            └──→ AUTHORIZED ──→ CAPTURED ──→ SETTLED (terminal)
///                  │     │            │
///                  │     ↓            ↓
///                  │   CANCELLED   REFUNDED (partial allowed)
///                  ↓
///               FAILED (terminal)
/// ```
///
/// "Terminal" in spec §3 means monetary fields become immutable, not that
/// `status` itself can never move again — `Captured` is monetary-terminal
/// but still advances to `Settled` or `Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Declined,
    Captured,
    Cancelled,
    Failed,
    Settled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Declined => "declined",
            Self::Captured => "captured",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Settled => "settled",
            Self::Refunded => "refunded",
        }
    }

    /// Exhaustive transition table — every allowed edge is listed
    /// explicitly. If it's not here, it's not allowed.
    pub fn can_transition_to(&self, new: &Self) -> bool {
        matches!(
            (self, new),
            (Self::Pending, Self::Authorized)
                | (Self::Pending, Self::Declined)
                | (Self::Pending, Self::Failed)
                | (Self::Authorized, Self::Captured)
                | (Self::Authorized, Self::Cancelled)
                | (Self::Captured, Self::Settled)
                | (Self::Captured, Self::Refunded)
        )
    }

    /// Once a payment reaches one of these, monetary fields are immutable
    /// (spec §3 `Payment` invariant). Distinct from FSM terminality.
    pub fn is_monetary_terminal(&self) -> bool {
        matches!(
            self,
            Self::Captured | Self::Declined | Self::Cancelled | Self::Failed
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "authorized" => Ok(Self::Authorized),
            "declined" => Ok(Self::Declined),
            "captured" => Ok(Self::Captured),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            "settled" => Ok(Self::Settled),
            "refunded" => Ok(Self::Refunded),
            other => Err(GatewayError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Reasons a payment can land in a non-success terminal state. Not
/// exhaustive of PSP decline codes (those are normalized separately,
/// spec §7) — this is the orchestrator-level reason shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    FraudBlock,
    AuthenticationFailed,
    PspHardDecline,
    PspExhausted,
    ValidationError,
}

impl DeclineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FraudBlock => "FRAUD_BLOCK",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::PspHardDecline => "PSP_HARD_DECLINE",
            Self::PspExhausted => "PSP_EXHAUSTED",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable record of one authorization attempt (spec §3 `Payment`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub external_id: ExternalId,
    pub merchant_id: MerchantId,
    pub money: Money,
    pub status: PaymentStatus,
    pub card_token: String,
    pub card_last_four: String,
    pub card_brand: CardBrand,
    pub psp_name: Option<String>,
    pub psp_reference: Option<String>,
    pub fraud_score: Option<f64>,
    pub three_ds_outcome: Option<String>,
    pub degraded_fraud_scoring: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub authorized_at: Option<chrono::DateTime<chrono::Utc>>,
    pub captured_at: Option<chrono::DateTime<chrono::Utc>>,
    pub settled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub decline_reason: Option<DeclineReason>,
}

impl Payment {
    /// Masked, client-safe view of the card material — never exposes
    /// more than the last four digits (spec §8 property 13).
    pub fn masked_card(&self) -> String {
        format!("****{}", self.card_last_four)
    }

    pub fn audit_entry(&self, actor: &str, action: &str, correlation: &CorrelationId) -> NewAuditEntry {
        NewAuditEntry {
            id: uuid::Uuid::now_v7(),
            entity_type: "payment".to_string(),
            entity_id: Some(self.id.as_uuid()),
            external_id: Some(self.external_id.as_str().to_string()),
            event_id: None,
            action: action.to_string(),
            actor: actor.to_string(),
            correlation_id: correlation.as_str().to_string(),
            detail: serde_json::json!({
                "status": self.status.as_str(),
                "amount": self.money.amount().cents(),
                "currency": self.money.currency().as_str(),
                "card": self.masked_card(),
            }),
        }
    }
}

/// Named params for constructing a new `Payment` row — every field
/// explicit at the call site, following the teacher's `NewPaymentParams`
/// convention.
pub struct NewPaymentParams {
    pub external_id: ExternalId,
    pub merchant_id: MerchantId,
    pub money: Money,
    pub card_token: String,
    pub card_last_four: String,
    pub card_brand: CardBrand,
}

impl Payment {
    pub fn new(p: NewPaymentParams) -> Self {
        Self {
            id: PaymentId::new(),
            external_id: p.external_id,
            merchant_id: p.merchant_id,
            money: p.money,
            status: PaymentStatus::Pending,
            card_token: p.card_token,
            card_last_four: p.card_last_four,
            card_brand: p.card_brand,
            psp_name: None,
            psp_reference: None,
            fraud_score: None,
            three_ds_outcome: None,
            degraded_fraud_scoring: false,
            created_at: chrono::Utc::now(),
            authorized_at: None,
            captured_at: None,
            settled_at: None,
            decline_reason: None,
        }
    }
}

/// What to do given an incoming status transition request — mirrors the
/// teacher's `PaymentAction`/`ExistingPayment::decide` pure-decision
/// pattern, generalized from Stripe-event reconciliation to the full FSM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    Apply,
    AlreadyApplied,
    Invalid { current: PaymentStatus },
}

pub fn decide_transition(current: PaymentStatus, requested: PaymentStatus) -> TransitionDecision {
    if current == requested {
        TransitionDecision::AlreadyApplied
    } else if current.can_transition_to(&requested) {
        TransitionDecision::Apply
    } else {
        TransitionDecision::Invalid { current }
    }
}

/// Result of processing an event through the payment pipeline/webhook
/// path (spec §4.6 idempotent consumption), generalized from the
/// teacher's `ProcessResult`.
#[derive(Debug)]
pub enum ProcessResult {
    Created(PaymentId),
    Updated(PaymentId),
    Stale(PaymentId),
    Duplicate,
    Anomaly(PaymentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_transition_valid_paths() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(&Authorized));
        assert!(Pending.can_transition_to(&Declined));
        assert!(Pending.can_transition_to(&Failed));
        assert!(Authorized.can_transition_to(&Captured));
        assert!(Authorized.can_transition_to(&Cancelled));
        assert!(Captured.can_transition_to(&Settled));
        assert!(Captured.can_transition_to(&Refunded));
    }

    #[test]
    fn can_transition_invalid_paths() {
        use PaymentStatus::*;
        assert!(!Pending.can_transition_to(&Pending));
        assert!(!Pending.can_transition_to(&Captured));
        assert!(!Declined.can_transition_to(&Authorized));
        assert!(!Captured.can_transition_to(&Authorized));
        assert!(!Settled.can_transition_to(&Refunded));
        assert!(!Refunded.can_transition_to(&Captured));
        assert!(!Cancelled.can_transition_to(&Authorized));
        assert!(!Failed.can_transition_to(&Authorized));
    }

    #[test]
    fn monetary_terminal_classification() {
        use PaymentStatus::*;
        assert!(Captured.is_monetary_terminal());
        assert!(Declined.is_monetary_terminal());
        assert!(Cancelled.is_monetary_terminal());
        assert!(Failed.is_monetary_terminal());
        assert!(!Pending.is_monetary_terminal());
        assert!(!Authorized.is_monetary_terminal());
        assert!(!Settled.is_monetary_terminal());
        assert!(!Refunded.is_monetary_terminal());
    }

    #[test]
    fn status_str_roundtrip() {
        let statuses = [
            PaymentStatus::Pending,
            PaymentStatus::Authorized,
            PaymentStatus::Declined,
            PaymentStatus::Captured,
            PaymentStatus::Cancelled,
            PaymentStatus::Failed,
            PaymentStatus::Settled,
            PaymentStatus::Refunded,
        ];
        for s in statuses {
            assert_eq!(PaymentStatus::try_from(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn decide_transition_cases() {
        use PaymentStatus::*;
        assert_eq!(decide_transition(Pending, Pending), TransitionDecision::AlreadyApplied);
        assert_eq!(decide_transition(Pending, Authorized), TransitionDecision::Apply);
        assert_eq!(
            decide_transition(Declined, Authorized),
            TransitionDecision::Invalid { current: Declined }
        );
    }
}
