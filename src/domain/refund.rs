use serde::{Deserialize, Serialize};

use super::id::{ExternalId, PaymentId};
use super::money::Money;

/// Child of a captured payment (spec §3 `Refund`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: uuid::Uuid,
    pub payment_id: PaymentId,
    pub external_id: ExternalId,
    pub amount: Money,
    pub status: RefundStatus,
    pub psp_reference: Option<String>,
    pub reason: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Completed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Refunds in these states count against the outstanding-amount
    /// invariant (spec §3: "sum(refunds.amount where status ∈ {PENDING,
    /// COMPLETED})").
    pub fn counts_toward_outstanding(&self) -> bool {
        matches!(self, Self::Pending | Self::Completed)
    }
}

/// Pure check for the refund-amount invariant (spec §3, §4.2, §8
/// property 6): the sum of in-flight-or-completed refunds plus the new
/// request amount must never exceed the parent payment's amount.
///
/// `existing` should already be filtered to the parent payment's refunds;
/// this function only applies the counting rule and the comparison, so
/// callers under a row lock can trust the result without racing.
pub fn check_refund_invariant(
    payment_amount: super::money::MoneyAmount,
    existing: &[Refund],
    requested: super::money::MoneyAmount,
) -> Result<(), super::error::GatewayError> {
    let outstanding = existing
        .iter()
        .filter(|r| r.status.counts_toward_outstanding())
        .try_fold(super::money::MoneyAmount::zero(), |acc, r| {
            acc.checked_add(r.amount.amount())
        })
        .ok_or_else(|| super::error::GatewayError::Integrity("refund sum overflow".into()))?;

    let total = outstanding
        .checked_add(requested)
        .ok_or_else(|| super::error::GatewayError::Integrity("refund sum overflow".into()))?;

    if total > payment_amount {
        return Err(super::error::GatewayError::BusinessDecline {
            reason: "REFUND_EXCEEDS_AMOUNT".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Currency, MoneyAmount};

    fn refund(amount: i64, status: RefundStatus) -> Refund {
        Refund {
            id: uuid::Uuid::now_v7(),
            payment_id: PaymentId::new(),
            external_id: ExternalId::new("re_1").unwrap(),
            amount: Money::new(MoneyAmount::new(amount).unwrap(), Currency::Usd),
            status,
            psp_reference: None,
            reason: "requested_by_customer".into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn full_refund_of_fresh_payment_succeeds() {
        let amount = MoneyAmount::new(10_000).unwrap();
        let result = check_refund_invariant(amount, &[], MoneyAmount::new(10_000).unwrap());
        assert!(result.is_ok());
    }

    #[test]
    fn second_full_refund_is_rejected() {
        let amount = MoneyAmount::new(10_000).unwrap();
        let existing = vec![refund(10_000, RefundStatus::Completed)];
        let result = check_refund_invariant(amount, &existing, MoneyAmount::new(1).unwrap());
        assert!(matches!(
            result,
            Err(crate::domain::error::GatewayError::BusinessDecline { .. })
        ));
    }

    #[test]
    fn failed_refunds_do_not_count_toward_outstanding() {
        let amount = MoneyAmount::new(10_000).unwrap();
        let existing = vec![refund(10_000, RefundStatus::Failed)];
        let result = check_refund_invariant(amount, &existing, MoneyAmount::new(10_000).unwrap());
        assert!(result.is_ok());
    }

    #[test]
    fn partial_refunds_accumulate() {
        let amount = MoneyAmount::new(10_000).unwrap();
        let existing = vec![refund(6_000, RefundStatus::Completed)];
        assert!(check_refund_invariant(amount, &existing, MoneyAmount::new(4_000).unwrap()).is_ok());
        assert!(check_refund_invariant(amount, &existing, MoneyAmount::new(4_001).unwrap()).is_err());
    }
}
