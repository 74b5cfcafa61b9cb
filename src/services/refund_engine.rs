//! Refund processing (spec §4.2): validates the outstanding-amount
//! invariant under a row lock, calls the originating PSP, and cascades
//! the parent payment to `Refunded` once the full amount has been
//! returned.

use std::sync::Arc;

use crate::collaborators::psp::{PspClient, PspOutcome};
use crate::domain::error::GatewayError;
use crate::domain::id::{CorrelationId, ExternalId, PaymentId};
use crate::domain::money::MoneyAmount;
use crate::domain::payment::PaymentStatus;
use crate::domain::refund::{check_refund_invariant, Refund, RefundStatus};
use crate::engine::event_bus::EventBus;
use crate::domain::event::{Event, EventType};
use crate::infra::postgres::{payment_repo, refund_repo};
use crate::services::audit_log;

pub struct RefundRequest {
    pub payment_id: PaymentId,
    pub external_id: ExternalId,
    pub amount: MoneyAmount,
    pub reason: String,
}

pub struct RefundEngine {
    pool: sqlx::PgPool,
    psps: Vec<Arc<dyn PspClient>>,
    event_bus: Arc<EventBus>,
}

impl RefundEngine {
    pub fn new(pool: sqlx::PgPool, psps: Vec<Arc<dyn PspClient>>, event_bus: Arc<EventBus>) -> Self {
        Self { pool, psps, event_bus }
    }

    fn psp_by_name(&self, name: Option<&str>) -> Result<Arc<dyn PspClient>, GatewayError> {
        let name = name.ok_or_else(|| GatewayError::Integrity("payment missing psp_name".into()))?;
        self.psps
            .iter()
            .find(|p| p.identity().name == name)
            .cloned()
            .ok_or_else(|| GatewayError::Integrity(format!("unknown psp: {name}")))
    }

    /// Row-locks the payment and its existing refunds for the whole
    /// operation so two concurrent refund requests against the same
    /// payment can never both pass the outstanding-amount check (spec
    /// §4.2, §8 property 6).
    pub async fn refund(&self, req: RefundRequest) -> Result<Refund, GatewayError> {
        let mut tx = self.pool.begin().await?;

        let payment = payment_repo::find_by_id_for_update(&mut tx, req.payment_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("payment {} not found", req.payment_id)))?;

        if !matches!(payment.status, PaymentStatus::Captured | PaymentStatus::Refunded) {
            return Err(GatewayError::BusinessDecline {
                reason: format!("cannot refund payment in status {}", payment.status),
            });
        }

        let existing = refund_repo::find_by_payment_id_for_update(&mut tx, req.payment_id).await?;
        check_refund_invariant(payment.money.amount(), &existing, req.amount)?;

        let psp = self.psp_by_name(payment.psp_name.as_deref())?;
        let psp_reference = payment
            .psp_reference
            .as_deref()
            .ok_or_else(|| GatewayError::Integrity("captured payment missing psp_reference".into()))?;

        let refund_money = crate::domain::money::Money::new(req.amount, payment.money.currency().clone());
        let mut refund = Refund {
            id: uuid::Uuid::now_v7(),
            payment_id: req.payment_id,
            external_id: req.external_id,
            amount: refund_money.clone(),
            status: RefundStatus::Pending,
            psp_reference: None,
            reason: req.reason,
            created_at: chrono::Utc::now(),
        };

        let outcome = psp.refund(psp_reference, &refund_money).await?;
        match outcome {
            PspOutcome::Approved { psp_reference } => {
                refund.status = RefundStatus::Completed;
                refund.psp_reference = Some(psp_reference);
            }
            PspOutcome::HardDeclined { psp_reference, .. } => {
                refund.status = RefundStatus::Failed;
                refund.psp_reference = Some(psp_reference);
            }
            PspOutcome::Transient(msg) => return Err(GatewayError::Transient(msg)),
        }

        refund_repo::insert(&mut tx, &refund).await?;

        let mut all_refunds = existing;
        all_refunds.push(refund.clone());
        let total_refunded = all_refunds
            .iter()
            .filter(|r| r.status.counts_toward_outstanding())
            .try_fold(MoneyAmount::zero(), |acc, r| acc.checked_add(r.amount.amount()))
            .ok_or_else(|| GatewayError::Integrity("refund sum overflow".into()))?;

        let fully_refunded = refund.status == RefundStatus::Completed && total_refunded == payment.money.amount();
        if fully_refunded {
            payment_repo::advance_status(&mut tx, payment.id, PaymentStatus::Refunded, None, None, None).await?;
        }

        let entry = payment.audit_entry("refund_engine", "refund", &CorrelationId::new());
        audit_log::record(&mut tx, entry).await?;

        tx.commit().await?;

        let event_type = if refund.status == RefundStatus::Completed {
            EventType::RefundCompleted
        } else {
            EventType::RefundFailed
        };
        let event = Event::new(
            event_type,
            CorrelationId::new().as_str().to_string(),
            uuid::Uuid::now_v7().to_string(),
            payment.id.as_uuid().to_string(),
            serde_json::json!({
                "refund_id": refund.id,
                "payment_id": payment.id.as_uuid(),
                "merchant_id": payment.merchant_id.as_str(),
                "amount": refund.amount.amount().cents(),
            }),
        );
        self.event_bus.publish(event).await?;

        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Currency, MoneyAmount};
    use crate::domain::refund::Refund as RefundDomain;

    fn refund_row(amount: i64, status: RefundStatus) -> RefundDomain {
        RefundDomain {
            id: uuid::Uuid::now_v7(),
            payment_id: PaymentId::new(),
            external_id: ExternalId::new("re_1").unwrap(),
            amount: crate::domain::money::Money::new(MoneyAmount::new(amount).unwrap(), Currency::Usd),
            status,
            psp_reference: None,
            reason: "requested_by_customer".into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn outstanding_sum_excludes_failed_refunds() {
        let existing = vec![refund_row(3_000, RefundStatus::Failed), refund_row(2_000, RefundStatus::Completed)];
        let result = check_refund_invariant(MoneyAmount::new(10_000).unwrap(), &existing, MoneyAmount::new(8_000).unwrap());
        assert!(result.is_ok());
    }
}
