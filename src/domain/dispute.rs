use serde::{Deserialize, Serialize};

use super::id::PaymentId;
use super::money::Money;

/// Chargeback record attached to a payment (spec §3 `Dispute`, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: uuid::Uuid,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub reason_code: String,
    pub status: DisputeStatus,
    pub deadline: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    PendingEvidence,
    Won,
    Lost,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PendingEvidence => "pending_evidence",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn can_transition_to(&self, new: &Self) -> bool {
        matches!(
            (self, new),
            (Self::Open, Self::PendingEvidence)
                | (Self::Open, Self::Won)
                | (Self::Open, Self::Lost)
                | (Self::PendingEvidence, Self::Won)
                | (Self::PendingEvidence, Self::Lost)
        )
    }
}

impl Dispute {
    /// On `LOST`, a reversing settlement adjustment must be recorded
    /// (spec §3 `Dispute` invariant, §4.8). Returns the negative amount
    /// the next settlement batch must carry as a compensating line.
    pub fn reversing_adjustment(&self) -> Option<Money> {
        (self.status == DisputeStatus::Lost).then(|| self.amount.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Currency, MoneyAmount};

    #[test]
    fn lost_dispute_yields_reversing_adjustment() {
        let dispute = Dispute {
            id: uuid::Uuid::now_v7(),
            payment_id: PaymentId::new(),
            amount: Money::new(MoneyAmount::new(5000).unwrap(), Currency::Usd),
            reason_code: "fraudulent".into(),
            status: DisputeStatus::Lost,
            deadline: chrono::Utc::now(),
        };
        assert!(dispute.reversing_adjustment().is_some());
    }

    #[test]
    fn won_dispute_yields_no_adjustment() {
        let dispute = Dispute {
            id: uuid::Uuid::now_v7(),
            payment_id: PaymentId::new(),
            amount: Money::new(MoneyAmount::new(5000).unwrap(), Currency::Usd),
            reason_code: "fraudulent".into(),
            status: DisputeStatus::Won,
            deadline: chrono::Utc::now(),
        };
        assert!(dispute.reversing_adjustment().is_none());
    }

    #[test]
    fn transition_table() {
        use DisputeStatus::*;
        assert!(Open.can_transition_to(&PendingEvidence));
        assert!(Open.can_transition_to(&Won));
        assert!(PendingEvidence.can_transition_to(&Lost));
        assert!(!Won.can_transition_to(&Lost));
        assert!(!Lost.can_transition_to(&Won));
    }
}
