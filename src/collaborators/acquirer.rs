//! The acquirer's settlement-side interface (spec §4.8, GLOSSARY
//! "Acquirer"): submitting a batch for funding and later receiving its
//! reconciliation report. Distinct from [`crate::collaborators::psp`]
//! — the PSP speaks per-transaction authorize/capture/void/refund, the
//! acquirer speaks per-batch settlement.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::GatewayError;
use crate::domain::money::MoneyAmount;

/// Outcome of submitting a batch for settlement.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub acquirer_reference: String,
}

/// The acquirer's reconciliation report for a previously submitted
/// batch (spec §4.8 step 4).
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub reported_total: MoneyAmount,
}

#[async_trait]
pub trait AcquirerClient: Send + Sync {
    async fn submit_batch(
        &self,
        batch_id: uuid::Uuid,
        total_amount: MoneyAmount,
    ) -> Result<SubmissionResult, GatewayError>;

    async fn reconcile_batch(&self, acquirer_reference: &str) -> Result<ReconciliationReport, GatewayError>;
}

/// Reference/test implementation (spec §8 seeded scenario F). Remembers
/// what each batch submitted so `reconcile_batch` can echo it back, with
/// an optional per-reference override so tests can script a mismatch
/// without a second implementation.
#[derive(Default)]
pub struct MockAcquirer {
    submitted: Mutex<HashMap<String, MoneyAmount>>,
    overrides: Mutex<HashMap<String, MoneyAmount>>,
}

impl MockAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `reconcile_batch` to report `total` for `acquirer_reference`
    /// instead of the amount actually submitted.
    pub fn script_mismatch(&self, acquirer_reference: &str, total: MoneyAmount) {
        self.overrides.lock().unwrap().insert(acquirer_reference.to_string(), total);
    }
}

#[async_trait]
impl AcquirerClient for MockAcquirer {
    async fn submit_batch(
        &self,
        batch_id: uuid::Uuid,
        total_amount: MoneyAmount,
    ) -> Result<SubmissionResult, GatewayError> {
        let reference = format!("acq_ref_{}", batch_id.simple());
        self.submitted.lock().unwrap().insert(reference.clone(), total_amount);
        Ok(SubmissionResult { acquirer_reference: reference })
    }

    async fn reconcile_batch(&self, acquirer_reference: &str) -> Result<ReconciliationReport, GatewayError> {
        if let Some(total) = self.overrides.lock().unwrap().get(acquirer_reference) {
            return Ok(ReconciliationReport { reported_total: *total });
        }
        let total = *self
            .submitted
            .lock()
            .unwrap()
            .get(acquirer_reference)
            .ok_or_else(|| GatewayError::NotFound(format!("unknown acquirer reference: {acquirer_reference}")))?;
        Ok(ReconciliationReport { reported_total: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reconciliation_echoes_submitted_total_by_default() {
        let acquirer = MockAcquirer::new();
        let batch_id = uuid::Uuid::now_v7();
        let submission = acquirer.submit_batch(batch_id, MoneyAmount::new(30000).unwrap()).await.unwrap();
        let report = acquirer.reconcile_batch(&submission.acquirer_reference).await.unwrap();
        assert_eq!(report.reported_total.cents(), 30000);
    }

    #[tokio::test]
    async fn scripted_mismatch_overrides_submitted_total() {
        let acquirer = MockAcquirer::new();
        let batch_id = uuid::Uuid::now_v7();
        let submission = acquirer.submit_batch(batch_id, MoneyAmount::new(30000).unwrap()).await.unwrap();
        acquirer.script_mismatch(&submission.acquirer_reference, MoneyAmount::new(29000).unwrap());
        let report = acquirer.reconcile_batch(&submission.acquirer_reference).await.unwrap();
        assert_eq!(report.reported_total.cents(), 29000);
    }
}
