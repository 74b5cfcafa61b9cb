use crate::domain::error::GatewayError;
use crate::domain::id::MerchantId;
use crate::domain::money::{Currency, MoneyAmount};
use crate::domain::settlement::{SettlementBatch, SettlementStatus};

fn status_from_str(s: &str) -> SettlementStatus {
    match s {
        "processing" => SettlementStatus::Processing,
        "settled" => SettlementStatus::Settled,
        "failed" => SettlementStatus::Failed,
        "reconciliation_alert" => SettlementStatus::ReconciliationAlert,
        _ => SettlementStatus::Pending,
    }
}

struct SettlementRow {
    id: uuid::Uuid,
    merchant_id: String,
    currency: String,
    settlement_date: chrono::NaiveDate,
    total_amount: i64,
    transaction_count: i32,
    status: String,
    acquirer_reference: Option<String>,
}

impl TryFrom<SettlementRow> for SettlementBatch {
    type Error = GatewayError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        Ok(SettlementBatch {
            id: row.id,
            merchant_id: MerchantId::new(row.merchant_id)?,
            currency: Currency::try_from(row.currency.as_str())?,
            settlement_date: row.settlement_date,
            total_amount: MoneyAmount::new(row.total_amount)?,
            transaction_count: row.transaction_count as u32,
            status: status_from_str(&row.status),
            acquirer_reference: row.acquirer_reference,
        })
    }
}

/// Captured payments not yet assigned to a settlement batch, for one
/// merchant/currency/day (spec §4.8 step 1 "aggregate captured
/// payments").
pub async fn unsettled_captured_amounts(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    merchant_id: &MerchantId,
    currency: &Currency,
    settlement_date: chrono::NaiveDate,
) -> Result<Vec<i64>, GatewayError> {
    let amounts = sqlx::query_scalar!(
        r#"
        SELECT amount FROM payments
        WHERE merchant_id = $1 AND currency = $2 AND status = 'captured'
          AND captured_at::date = $3
          AND id NOT IN (SELECT payment_id FROM settlement_batch_entries)
        "#,
        merchant_id.as_str(),
        currency.as_str(),
        settlement_date,
    )
    .fetch_all(&mut **tx)
    .await?;

    Ok(amounts)
}

/// Same filter as [`unsettled_captured_amounts`], returning ids instead
/// of amounts — used to populate `settlement_batch_entries` for the
/// batch just created from those amounts.
pub async fn unsettled_captured_payment_ids(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    merchant_id: &MerchantId,
    currency: &Currency,
    settlement_date: chrono::NaiveDate,
) -> Result<Vec<uuid::Uuid>, GatewayError> {
    let ids = sqlx::query_scalar!(
        r#"
        SELECT id FROM payments
        WHERE merchant_id = $1 AND currency = $2 AND status = 'captured'
          AND captured_at::date = $3
          AND id NOT IN (SELECT payment_id FROM settlement_batch_entries)
        "#,
        merchant_id.as_str(),
        currency.as_str(),
        settlement_date,
    )
    .fetch_all(&mut **tx)
    .await?;

    Ok(ids)
}

/// Payment ids belonging to a settled batch (spec §4.8 step 5: these
/// payments cascade to `SETTLED`).
pub async fn batch_entry_payment_ids(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    batch_id: uuid::Uuid,
) -> Result<Vec<uuid::Uuid>, GatewayError> {
    let ids = sqlx::query_scalar!(
        "SELECT payment_id FROM settlement_batch_entries WHERE settlement_batch_id = $1",
        batch_id,
    )
    .fetch_all(&mut **tx)
    .await?;

    Ok(ids)
}

pub async fn insert_batch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    batch: &SettlementBatch,
    payment_ids: &[uuid::Uuid],
) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        INSERT INTO settlement_batches
            (id, merchant_id, currency, settlement_date, total_amount, transaction_count, status, acquirer_reference)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
        batch.id,
        batch.merchant_id.as_str(),
        batch.currency.as_str(),
        batch.settlement_date,
        batch.total_amount.cents(),
        batch.transaction_count as i32,
        batch.status.as_str(),
        batch.acquirer_reference,
    )
    .execute(&mut **tx)
    .await?;

    for payment_id in payment_ids {
        sqlx::query!(
            "INSERT INTO settlement_batch_entries (settlement_batch_id, payment_id) VALUES ($1, $2)",
            batch.id,
            payment_id,
        )
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn reconcile(
    pool: &sqlx::PgPool,
    batch_id: uuid::Uuid,
    status: SettlementStatus,
    acquirer_reference: &str,
) -> Result<(), GatewayError> {
    sqlx::query!(
        "UPDATE settlement_batches SET status = $1, acquirer_reference = $2 WHERE id = $3",
        status.as_str(),
        acquirer_reference,
        batch_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Batches awaiting reconciliation (spec §4.8 steps 4-5). A batch is
/// submitted to the acquirer in the same transaction it's created in,
/// so by the time a scheduler tick looks for work there is none left in
/// `pending` — it's `processing` until the acquirer's report closes it
/// out, which is the state this actually needs to find.
pub async fn find_pending(pool: &sqlx::PgPool, limit: i64) -> Result<Vec<SettlementBatch>, GatewayError> {
    let rows = sqlx::query_as!(
        SettlementRow,
        r#"
        SELECT id, merchant_id, currency, settlement_date, total_amount, transaction_count, status, acquirer_reference
        FROM settlement_batches WHERE status IN ('pending', 'processing') ORDER BY settlement_date LIMIT $1
        "#,
        limit,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SettlementBatch::try_from).collect()
}
