use crate::domain::error::GatewayError;
use crate::domain::id::{ExternalId, PaymentId};
use crate::domain::money::{Currency, Money, MoneyAmount};
use crate::domain::refund::{Refund, RefundStatus};

fn status_from_str(s: &str) -> RefundStatus {
    match s {
        "completed" => RefundStatus::Completed,
        "failed" => RefundStatus::Failed,
        _ => RefundStatus::Pending,
    }
}

struct RefundRow {
    id: uuid::Uuid,
    payment_id: uuid::Uuid,
    external_id: String,
    amount: i64,
    currency: String,
    status: String,
    psp_reference: Option<String>,
    reason: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = GatewayError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        Ok(Refund {
            id: row.id,
            payment_id: PaymentId::from(row.payment_id),
            external_id: ExternalId::new(row.external_id)?,
            amount: Money::new(MoneyAmount::new(row.amount)?, Currency::try_from(row.currency.as_str())?),
            status: status_from_str(&row.status),
            psp_reference: row.psp_reference,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

/// Existing refunds against a payment, locked `FOR UPDATE` so the
/// outstanding-amount invariant check in `services::refund_engine`
/// (spec §4.2) serializes against concurrent refund requests on the
/// same payment.
pub async fn find_by_payment_id_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment_id: PaymentId,
) -> Result<Vec<Refund>, GatewayError> {
    let rows = sqlx::query_as!(
        RefundRow,
        r#"
        SELECT id, payment_id, external_id, amount, currency, status, psp_reference, reason, created_at
        FROM refunds WHERE payment_id = $1
        FOR UPDATE
        "#,
        payment_id.as_uuid(),
    )
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter().map(Refund::try_from).collect()
}

pub async fn insert(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, refund: &Refund) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        INSERT INTO refunds (id, payment_id, external_id, amount, currency, status, psp_reference, reason, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
        refund.id,
        refund.payment_id.as_uuid(),
        refund.external_id.as_str(),
        refund.amount.amount().cents(),
        refund.amount.currency().as_str(),
        refund.status.as_str(),
        refund.psp_reference,
        refund.reason,
        refund.created_at,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: uuid::Uuid,
    status: RefundStatus,
    psp_reference: Option<&str>,
) -> Result<(), GatewayError> {
    sqlx::query!(
        "UPDATE refunds SET status = $1, psp_reference = COALESCE($2, psp_reference) WHERE id = $3",
        status.as_str(),
        psp_reference,
        id,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}
