use async_trait::async_trait;

use crate::domain::error::GatewayError;
use crate::engine::idempotency::{CachedResponse, IdempotencyRecord, IdempotencyRepo};

/// Postgres-backed idempotency store (spec §4.3). Reservation uses the
/// same `INSERT ... ON CONFLICT DO NOTHING RETURNING` dedup idiom the
/// teacher uses for provider-event dedup — here the conflict target is
/// `(merchant_id, key)` rather than an upstream event id, so two
/// merchants reusing the same raw key never collide.
pub struct PostgresIdempotencyRepo {
    pool: sqlx::PgPool,
}

impl PostgresIdempotencyRepo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

struct IdempotencyRow {
    merchant_id: String,
    key: String,
    request_hash: String,
    response_status: Option<i32>,
    response_body: Option<serde_json::Value>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<IdempotencyRow> for IdempotencyRecord {
    fn from(row: IdempotencyRow) -> Self {
        let response = match (row.response_status, row.response_body) {
            (Some(status), Some(body)) => Some(CachedResponse { status_code: status as u16, body }),
            _ => None,
        };
        IdempotencyRecord {
            merchant_id: row.merchant_id,
            key: row.key,
            request_hash: row.request_hash,
            response,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl IdempotencyRepo for PostgresIdempotencyRepo {
    async fn reserve(
        &self,
        merchant_id: &str,
        key: &str,
        request_hash: &str,
    ) -> Result<Option<IdempotencyRecord>, GatewayError> {
        let row = sqlx::query_as!(
            IdempotencyRow,
            r#"
            INSERT INTO idempotency_records (merchant_id, key, request_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (merchant_id, key) DO NOTHING
            RETURNING merchant_id, key, request_hash, response_status, response_body, created_at
            "#,
            merchant_id,
            key,
            request_hash,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdempotencyRecord::from))
    }

    async fn find(&self, merchant_id: &str, key: &str) -> Result<Option<IdempotencyRecord>, GatewayError> {
        let row = sqlx::query_as!(
            IdempotencyRow,
            "SELECT merchant_id, key, request_hash, response_status, response_body, created_at \
             FROM idempotency_records WHERE merchant_id = $1 AND key = $2",
            merchant_id,
            key,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdempotencyRecord::from))
    }

    async fn store_result(
        &self,
        merchant_id: &str,
        key: &str,
        response: CachedResponse,
    ) -> Result<(), GatewayError> {
        sqlx::query!(
            "UPDATE idempotency_records SET response_status = $1, response_body = $2 \
             WHERE merchant_id = $3 AND key = $4",
            response.status_code as i32,
            response.body,
            merchant_id,
            key,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release(&self, merchant_id: &str, key: &str) -> Result<(), GatewayError> {
        sqlx::query!(
            "DELETE FROM idempotency_records WHERE merchant_id = $1 AND key = $2 AND response_status IS NULL",
            merchant_id,
            key,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Deletes idempotency records past the retention window (spec §4.3
/// "retain completed records for at least 24 hours"). Run by a
/// background sweep, same cadence pattern as the teacher's stale-job
/// reaper.
pub async fn purge_expired(pool: &sqlx::PgPool, retention: chrono::Duration) -> Result<u64, GatewayError> {
    let cutoff = chrono::Utc::now() - retention;
    let result = sqlx::query!("DELETE FROM idempotency_records WHERE created_at < $1", cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
