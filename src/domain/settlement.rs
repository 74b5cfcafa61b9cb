use serde::{Deserialize, Serialize};

use super::id::MerchantId;
use super::money::{Currency, MoneyAmount};

/// Grouping of captured payments for one merchant/currency/day (spec §3
/// `SettlementBatch`, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub id: uuid::Uuid,
    pub merchant_id: MerchantId,
    pub currency: Currency,
    pub settlement_date: chrono::NaiveDate,
    pub total_amount: MoneyAmount,
    pub transaction_count: u32,
    pub status: SettlementStatus,
    pub acquirer_reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Processing,
    Settled,
    Failed,
    ReconciliationAlert,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Settled => "settled",
            Self::Failed => "failed",
            Self::ReconciliationAlert => "reconciliation_alert",
        }
    }
}

impl SettlementBatch {
    /// Builds a new pending batch from a set of gross transaction
    /// amounts. `total_amount` is always the sum of children — there is
    /// no path that lets it diverge (spec §3 invariant, §8 property 14).
    pub fn new(
        merchant_id: MerchantId,
        currency: Currency,
        settlement_date: chrono::NaiveDate,
        child_amounts: &[MoneyAmount],
    ) -> Result<Self, super::error::GatewayError> {
        let total = sum_amounts(child_amounts)?;
        Ok(Self {
            id: uuid::Uuid::now_v7(),
            merchant_id,
            currency,
            settlement_date,
            total_amount: total,
            transaction_count: child_amounts.len() as u32,
            status: SettlementStatus::Pending,
            acquirer_reference: None,
        })
    }

    /// Reconciliation only closes the batch on exact equality with the
    /// acquirer-reported total (spec §4.8 step 4, §8 property 14). A
    /// mismatch transitions to `ReconciliationAlert` and never silently
    /// heals (spec §7 "Integrity failure").
    pub fn reconcile(&mut self, acquirer_reported_total: MoneyAmount) {
        if acquirer_reported_total == self.total_amount {
            self.status = SettlementStatus::Settled;
        } else {
            self.status = SettlementStatus::ReconciliationAlert;
        }
    }
}

fn sum_amounts(amounts: &[MoneyAmount]) -> Result<MoneyAmount, super::error::GatewayError> {
    amounts
        .iter()
        .try_fold(MoneyAmount::zero(), |acc, &a| acc.checked_add(a))
        .ok_or_else(|| super::error::GatewayError::Integrity("settlement total overflow".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mid() -> MerchantId {
        MerchantId::new("merchant_1").unwrap()
    }

    #[test]
    fn total_equals_sum_of_children() {
        let children = vec![
            MoneyAmount::new(1000).unwrap(),
            MoneyAmount::new(2000).unwrap(),
            MoneyAmount::new(500).unwrap(),
        ];
        let batch = SettlementBatch::new(
            mid(),
            Currency::Usd,
            chrono::Utc::now().date_naive(),
            &children,
        )
        .unwrap();
        assert_eq!(batch.total_amount.cents(), 3500);
        assert_eq!(batch.transaction_count, 3);
    }

    #[test]
    fn reconciliation_matches_closes_batch() {
        let children = vec![MoneyAmount::new(30000).unwrap()];
        let mut batch =
            SettlementBatch::new(mid(), Currency::Usd, chrono::Utc::now().date_naive(), &children)
                .unwrap();
        batch.reconcile(MoneyAmount::new(30000).unwrap());
        assert_eq!(batch.status, SettlementStatus::Settled);
    }

    #[test]
    fn reconciliation_mismatch_raises_alert_never_settles() {
        let children = vec![MoneyAmount::new(30000).unwrap()];
        let mut batch =
            SettlementBatch::new(mid(), Currency::Usd, chrono::Utc::now().date_naive(), &children)
                .unwrap();
        batch.reconcile(MoneyAmount::new(29000).unwrap());
        assert_eq!(batch.status, SettlementStatus::ReconciliationAlert);
        assert_ne!(batch.status, SettlementStatus::Settled);
    }
}
