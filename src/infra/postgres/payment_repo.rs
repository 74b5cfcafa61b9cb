use crate::domain::card::CardBrand;
use crate::domain::error::GatewayError;
use crate::domain::id::{ExternalId, MerchantId, PaymentId};
use crate::domain::money::{Currency, Money, MoneyAmount};
use crate::domain::payment::{DeclineReason, Payment, PaymentStatus};

fn brand_from_str(s: &str) -> CardBrand {
    match s {
        "visa" => CardBrand::Visa,
        "mastercard" => CardBrand::Mastercard,
        "amex" => CardBrand::Amex,
        "discover" => CardBrand::Discover,
        _ => CardBrand::Unknown,
    }
}

struct PaymentRow {
    id: uuid::Uuid,
    external_id: String,
    merchant_id: String,
    amount: i64,
    currency: String,
    status: String,
    card_token: String,
    card_last_four: String,
    card_brand: String,
    psp_name: Option<String>,
    psp_reference: Option<String>,
    fraud_score: Option<f64>,
    three_ds_outcome: Option<String>,
    degraded_fraud_scoring: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    authorized_at: Option<chrono::DateTime<chrono::Utc>>,
    captured_at: Option<chrono::DateTime<chrono::Utc>>,
    settled_at: Option<chrono::DateTime<chrono::Utc>>,
    decline_reason: Option<String>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = GatewayError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from(row.id),
            external_id: ExternalId::new(row.external_id)?,
            merchant_id: MerchantId::new(row.merchant_id)?,
            money: Money::new(MoneyAmount::new(row.amount)?, Currency::try_from(row.currency.as_str())?),
            status: PaymentStatus::try_from(row.status.as_str())?,
            card_token: row.card_token,
            card_last_four: row.card_last_four,
            card_brand: brand_from_str(&row.card_brand),
            psp_name: row.psp_name,
            psp_reference: row.psp_reference,
            fraud_score: row.fraud_score,
            three_ds_outcome: row.three_ds_outcome,
            degraded_fraud_scoring: row.degraded_fraud_scoring,
            created_at: row.created_at,
            authorized_at: row.authorized_at,
            captured_at: row.captured_at,
            settled_at: row.settled_at,
            decline_reason: row.decline_reason.map(|r| match r.as_str() {
                "FRAUD_BLOCK" => DeclineReason::FraudBlock,
                "AUTHENTICATION_FAILED" => DeclineReason::AuthenticationFailed,
                "PSP_HARD_DECLINE" => DeclineReason::PspHardDecline,
                "PSP_EXHAUSTED" => DeclineReason::PspExhausted,
                _ => DeclineReason::ValidationError,
            }),
        })
    }
}

/// Inserts a brand-new payment row in `pending` status (spec §4.1 step
/// 7). Callers hold the per-`external_id` advisory lock acquired by
/// [`with_external_id_lock`] for the whole orchestration, same as the
/// teacher's pipeline.
pub async fn insert_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment: &Payment,
) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        INSERT INTO payments
            (id, external_id, merchant_id, amount, currency, status,
             card_token, card_last_four, card_brand, psp_name, psp_reference,
             fraud_score, three_ds_outcome, degraded_fraud_scoring,
             created_at, authorized_at, captured_at, settled_at, decline_reason)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#,
        payment.id.as_uuid(),
        payment.external_id.as_str(),
        payment.merchant_id.as_str(),
        payment.money.amount().cents(),
        payment.money.currency().as_str(),
        payment.status.as_str(),
        payment.card_token,
        payment.card_last_four,
        payment.card_brand.as_str(),
        payment.psp_name,
        payment.psp_reference,
        payment.fraud_score,
        payment.three_ds_outcome,
        payment.degraded_fraud_scoring,
        payment.created_at,
        payment.authorized_at,
        payment.captured_at,
        payment.settled_at,
        payment.decline_reason.as_ref().map(|r| r.as_str()),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &sqlx::PgPool, id: PaymentId) -> Result<Option<Payment>, GatewayError> {
    let row = sqlx::query_as!(
        PaymentRow,
        r#"
        SELECT id, external_id, merchant_id, amount, currency, status,
               card_token, card_last_four, card_brand, psp_name, psp_reference,
               fraud_score, three_ds_outcome, degraded_fraud_scoring,
               created_at, authorized_at, captured_at, settled_at, decline_reason
        FROM payments WHERE id = $1
        "#,
        id.as_uuid(),
    )
    .fetch_optional(pool)
    .await?;

    row.map(Payment::try_from).transpose()
}

/// Row-locked fetch for operations that read-then-write a payment within
/// one transaction (spec §4.2 refund serialization, §4.1 step 7 on the
/// capture/void path).
pub async fn find_by_id_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: PaymentId,
) -> Result<Option<Payment>, GatewayError> {
    let row = sqlx::query_as!(
        PaymentRow,
        r#"
        SELECT id, external_id, merchant_id, amount, currency, status,
               card_token, card_last_four, card_brand, psp_name, psp_reference,
               fraud_score, three_ds_outcome, degraded_fraud_scoring,
               created_at, authorized_at, captured_at, settled_at, decline_reason
        FROM payments WHERE id = $1
        FOR UPDATE
        "#,
        id.as_uuid(),
    )
    .fetch_optional(&mut **tx)
    .await?;

    row.map(Payment::try_from).transpose()
}

pub async fn find_by_external_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    external_id: &ExternalId,
) -> Result<Option<Payment>, GatewayError> {
    let row = sqlx::query_as!(
        PaymentRow,
        r#"
        SELECT id, external_id, merchant_id, amount, currency, status,
               card_token, card_last_four, card_brand, psp_name, psp_reference,
               fraud_score, three_ds_outcome, degraded_fraud_scoring,
               created_at, authorized_at, captured_at, settled_at, decline_reason
        FROM payments WHERE external_id = $1
        "#,
        external_id.as_str(),
    )
    .fetch_optional(&mut **tx)
    .await?;

    row.map(Payment::try_from).transpose()
}

/// Advances status and whichever timestamp/decline fields go with it
/// (spec §4.1 FSM). Monetary fields are never touched here once a
/// payment is monetary-terminal (spec §3 invariant) — callers must not
/// call this after `is_monetary_terminal()` except for the
/// Captured -> Settled/Refunded edges, which don't touch money either.
pub async fn advance_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: PaymentId,
    new_status: PaymentStatus,
    psp_name: Option<&str>,
    psp_reference: Option<&str>,
    decline_reason: Option<DeclineReason>,
) -> Result<(), GatewayError> {
    let now = chrono::Utc::now();
    let (authorized_at, captured_at, settled_at) = match new_status {
        PaymentStatus::Authorized => (Some(now), None, None),
        PaymentStatus::Captured => (None, Some(now), None),
        PaymentStatus::Settled => (None, None, Some(now)),
        _ => (None, None, None),
    };

    sqlx::query!(
        r#"
        UPDATE payments
        SET status = $1,
            psp_name = COALESCE($2, psp_name),
            psp_reference = COALESCE($3, psp_reference),
            decline_reason = COALESCE($4, decline_reason),
            authorized_at = COALESCE($5, authorized_at),
            captured_at = COALESCE($6, captured_at),
            settled_at = COALESCE($7, settled_at),
            updated_at = now()
        WHERE id = $8
        "#,
        new_status.as_str(),
        psp_name,
        psp_reference,
        decline_reason.as_ref().map(|r| r.as_str()),
        authorized_at,
        captured_at,
        settled_at,
        id.as_uuid(),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Paginated, merchant-scoped transaction listing for `GET
/// /transactions` (spec §6). Keyset pagination on `(created_at, id)`
/// descending rather than `OFFSET`, so a page boundary never shifts
/// under concurrent inserts.
pub async fn list_transactions(
    pool: &sqlx::PgPool,
    merchant_id: &MerchantId,
    status: Option<PaymentStatus>,
    before: Option<(chrono::DateTime<chrono::Utc>, uuid::Uuid)>,
    limit: i64,
) -> Result<Vec<Payment>, GatewayError> {
    let status_str = status.map(|s| s.as_str());

    let rows = if let Some((before_created_at, before_id)) = before {
        sqlx::query_as!(
            PaymentRow,
            r#"
            SELECT id, external_id, merchant_id, amount, currency, status,
                   card_token, card_last_four, card_brand, psp_name, psp_reference,
                   fraud_score, three_ds_outcome, degraded_fraud_scoring,
                   created_at, authorized_at, captured_at, settled_at, decline_reason
            FROM payments
            WHERE merchant_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND (created_at, id) < ($3, $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5
            "#,
            merchant_id.as_str(),
            status_str,
            before_created_at,
            before_id,
            limit,
        )
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as!(
            PaymentRow,
            r#"
            SELECT id, external_id, merchant_id, amount, currency, status,
                   card_token, card_last_four, card_brand, psp_name, psp_reference,
                   fraud_score, three_ds_outcome, degraded_fraud_scoring,
                   created_at, authorized_at, captured_at, settled_at, decline_reason
            FROM payments
            WHERE merchant_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
            merchant_id.as_str(),
            status_str,
            limit,
        )
        .fetch_all(pool)
        .await?
    };

    rows.into_iter().map(Payment::try_from).collect()
}

/// Serializes all processing for one `external_id` (spec §4.1,
/// grounded in the teacher's `pg_advisory_xact_lock(hashtext($1))`
/// idiom). The lock is released automatically at transaction end.
pub async fn lock_external_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    external_id: &ExternalId,
) -> Result<(), GatewayError> {
    sqlx::query!("SET LOCAL lock_timeout = '5s'").execute(&mut **tx).await?;
    sqlx::query!("SELECT pg_advisory_xact_lock(hashtext($1))", external_id.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(())
}
