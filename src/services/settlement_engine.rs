//! Scheduled settlement job (spec §4.8): aggregate captured payments
//! into a batch, submit to the acquirer, reconcile once the report
//! arrives, and fold any newly `LOST` disputes into the next batch as a
//! reversing line.

use std::sync::Arc;

use crate::collaborators::acquirer::AcquirerClient;
use crate::domain::error::GatewayError;
use crate::domain::id::MerchantId;
use crate::domain::money::{Currency, MoneyAmount};
use crate::domain::payment::PaymentStatus;
use crate::domain::settlement::{SettlementBatch, SettlementStatus};
use crate::domain::event::{Event, EventType};
use crate::domain::id::CorrelationId;
use crate::engine::event_bus::EventBus;
use crate::infra::postgres::{dispute_repo, payment_repo, settlement_repo};

pub struct SettlementEngine {
    pool: sqlx::PgPool,
    acquirer: Arc<dyn AcquirerClient>,
    event_bus: Arc<EventBus>,
}

impl SettlementEngine {
    pub fn new(pool: sqlx::PgPool, acquirer: Arc<dyn AcquirerClient>, event_bus: Arc<EventBus>) -> Self {
        Self { pool, acquirer, event_bus }
    }

    /// Steps 1-3 of spec §4.8: aggregate, create the batch, submit it.
    /// Returns `None` when there is nothing to settle rather than
    /// creating an empty batch.
    pub async fn create_and_submit_batch(
        &self,
        merchant_id: &MerchantId,
        currency: &Currency,
        settlement_date: chrono::NaiveDate,
    ) -> Result<Option<uuid::Uuid>, GatewayError> {
        let mut tx = self.pool.begin().await?;

        let amounts = settlement_repo::unsettled_captured_amounts(&mut tx, merchant_id, currency, settlement_date)
            .await?;
        if amounts.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        let money_amounts: Vec<MoneyAmount> = amounts.iter().map(|&a| MoneyAmount::new(a)).collect::<Result<_, _>>()?;

        // Fold any unreversed LOST disputes into this batch as negative
        // lines (spec §4.8 "reversing adjustments carried into the next
        // batch"). Lookup happens outside the aggregation transaction
        // since disputes are not scoped to this merchant/currency query.
        let losses = dispute_repo::find_unreversed_losses(&self.pool).await?;
        let mut adjusted_amounts = money_amounts;
        for loss in &losses {
            if let Some(adjustment) = loss.reversing_adjustment() {
                let negated = MoneyAmount::zero()
                    .checked_sub(adjustment.amount())
                    .ok_or_else(|| GatewayError::Integrity("reversing adjustment underflow".into()))?;
                adjusted_amounts.push(negated);
            }
        }

        let batch = SettlementBatch::new(merchant_id.clone(), currency.clone(), settlement_date, &adjusted_amounts)?;

        let payment_ids =
            settlement_repo::unsettled_captured_payment_ids(&mut tx, merchant_id, currency, settlement_date).await?;

        settlement_repo::insert_batch(&mut tx, &batch, &payment_ids).await?;
        tx.commit().await?;

        for loss in &losses {
            dispute_repo::mark_reversed(&self.pool, loss.id).await?;
        }

        let submission = self.acquirer.submit_batch(batch.id, batch.total_amount).await?;
        settlement_repo::reconcile(&self.pool, batch.id, SettlementStatus::Processing, &submission.acquirer_reference)
            .await?;

        self.publish(EventType::SettlementBatchCreated, &batch).await?;

        Ok(Some(batch.id))
    }

    /// Steps 4-5 of spec §4.8: pull the acquirer's report and close the
    /// batch, or raise a reconciliation alert on mismatch. Never
    /// self-heals a mismatch (spec §7 "Integrity failure").
    pub async fn reconcile(&self, batch_id: uuid::Uuid, acquirer_reference: &str) -> Result<SettlementStatus, GatewayError> {
        let report = self.acquirer.reconcile_batch(acquirer_reference).await?;

        let pending = settlement_repo::find_pending(&self.pool, 10_000).await?;
        let mut batch = pending
            .into_iter()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| GatewayError::NotFound(format!("settlement batch {batch_id} not found among pending")))?;

        batch.reconcile(report.reported_total);
        settlement_repo::reconcile(&self.pool, batch.id, batch.status, acquirer_reference).await?;

        match batch.status {
            SettlementStatus::Settled => {
                let mut tx = self.pool.begin().await?;
                let payment_ids = settlement_repo::batch_entry_payment_ids(&mut tx, batch.id).await?;
                for payment_id in payment_ids {
                    payment_repo::advance_status(
                        &mut tx,
                        payment_id.into(),
                        PaymentStatus::Settled,
                        None,
                        None,
                        None,
                    )
                    .await?;
                }
                tx.commit().await?;
                self.publish(EventType::SettlementBatchSettled, &batch).await?;
            }
            SettlementStatus::ReconciliationAlert => {
                self.publish(EventType::SettlementReconciliationAlert, &batch).await?;
            }
            _ => {}
        }

        Ok(batch.status)
    }

    async fn publish(&self, event_type: EventType, batch: &SettlementBatch) -> Result<(), GatewayError> {
        let event = Event::new(
            event_type,
            CorrelationId::new().as_str().to_string(),
            uuid::Uuid::now_v7().to_string(),
            batch.id.to_string(),
            serde_json::json!({
                "settlement_batch_id": batch.id,
                "merchant_id": batch.merchant_id.as_str(),
            }),
        );
        self.event_bus.publish(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::acquirer::MockAcquirer;

    // `create_and_submit_batch`/`reconcile` need a live Postgres pool for
    // the aggregation and cascade queries; that coverage lives in
    // tests/settlement_flow.rs. The acquirer round trip and the
    // mismatch-never-self-heals rule are exercised here and in
    // domain::settlement's own tests.

    #[tokio::test]
    async fn acquirer_reconciliation_mismatch_is_detectable_before_cascade() {
        let acquirer = MockAcquirer::new();
        let batch_id = uuid::Uuid::now_v7();
        let submitted = MoneyAmount::new(50_000).unwrap();
        let submission = acquirer.submit_batch(batch_id, submitted).await.unwrap();

        acquirer.script_mismatch(&submission.acquirer_reference, MoneyAmount::new(49_000).unwrap());
        let report = acquirer.reconcile_batch(&submission.acquirer_reference).await.unwrap();

        let mut batch = SettlementBatch::new(
            MerchantId::new("merchant_1").unwrap(),
            Currency::Usd,
            chrono::Utc::now().date_naive(),
            &[submitted],
        )
        .unwrap();
        batch.reconcile(report.reported_total);

        assert_eq!(batch.status, SettlementStatus::ReconciliationAlert);
    }
}
