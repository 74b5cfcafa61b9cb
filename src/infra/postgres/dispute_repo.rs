use crate::domain::dispute::{Dispute, DisputeStatus};
use crate::domain::error::GatewayError;
use crate::domain::id::PaymentId;
use crate::domain::money::{Currency, Money, MoneyAmount};

fn status_from_str(s: &str) -> DisputeStatus {
    match s {
        "pending_evidence" => DisputeStatus::PendingEvidence,
        "won" => DisputeStatus::Won,
        "lost" => DisputeStatus::Lost,
        _ => DisputeStatus::Open,
    }
}

struct DisputeRow {
    id: uuid::Uuid,
    payment_id: uuid::Uuid,
    amount: i64,
    currency: String,
    reason_code: String,
    status: String,
    deadline: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<DisputeRow> for Dispute {
    type Error = GatewayError;

    fn try_from(row: DisputeRow) -> Result<Self, Self::Error> {
        Ok(Dispute {
            id: row.id,
            payment_id: PaymentId::from(row.payment_id),
            amount: Money::new(MoneyAmount::new(row.amount)?, Currency::try_from(row.currency.as_str())?),
            reason_code: row.reason_code,
            status: status_from_str(&row.status),
            deadline: row.deadline,
        })
    }
}

pub async fn insert(pool: &sqlx::PgPool, dispute: &Dispute) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        INSERT INTO disputes (id, payment_id, amount, currency, reason_code, status, deadline)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        dispute.id,
        dispute.payment_id.as_uuid(),
        dispute.amount.amount().cents(),
        dispute.amount.currency().as_str(),
        dispute.reason_code,
        dispute.status.as_str(),
        dispute.deadline,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_payment_id(pool: &sqlx::PgPool, payment_id: PaymentId) -> Result<Vec<Dispute>, GatewayError> {
    let rows = sqlx::query_as!(
        DisputeRow,
        r#"
        SELECT id, payment_id, amount, currency, reason_code, status, deadline
        FROM disputes WHERE payment_id = $1
        "#,
        payment_id.as_uuid(),
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Dispute::try_from).collect()
}

/// Disputes resolved `LOST` since a given instant and not yet folded
/// into a settlement batch (spec §4.8 "reversing adjustments carried
/// into the next batch").
pub async fn find_unreversed_losses(pool: &sqlx::PgPool) -> Result<Vec<Dispute>, GatewayError> {
    let rows = sqlx::query_as!(
        DisputeRow,
        r#"
        SELECT id, payment_id, amount, currency, reason_code, status, deadline
        FROM disputes WHERE status = 'lost' AND reversed_at IS NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Dispute::try_from).collect()
}

pub async fn mark_reversed(pool: &sqlx::PgPool, id: uuid::Uuid) -> Result<(), GatewayError> {
    sqlx::query!("UPDATE disputes SET reversed_at = now() WHERE id = $1", id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_status(pool: &sqlx::PgPool, id: uuid::Uuid, status: DisputeStatus) -> Result<(), GatewayError> {
    sqlx::query!("UPDATE disputes SET status = $1 WHERE id = $2", status.as_str(), id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_open(pool: &sqlx::PgPool, limit: i64) -> Result<Vec<Dispute>, GatewayError> {
    let rows = sqlx::query_as!(
        DisputeRow,
        r#"
        SELECT id, payment_id, amount, currency, reason_code, status, deadline
        FROM disputes WHERE status IN ('open', 'pending_evidence') ORDER BY deadline LIMIT $1
        "#,
        limit,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Dispute::try_from).collect()
}
