use crate::domain::error::GatewayError;

/// A unit of deferred work: a webhook delivery, a retry of a failed PSP
/// call, or a saga compensation task (spec §4.5 dead-letter queue,
/// §4.10 webhook retries). Grounded directly in the teacher's
/// `payment_jobs` table/`job_repo` module — same claim/complete/fail/
/// reap lifecycle, generalized from "Stripe webhook replay" to any
/// retryable background unit.
pub struct JobRow {
    pub id: uuid::Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
}

/// Enqueues a job for later processing. `dedup_key` prevents the same
/// logical job (e.g. the same webhook delivery) from being enqueued
/// twice; pass a fresh UUID string when no natural dedup key exists.
pub async fn enqueue(
    pool: &sqlx::PgPool,
    kind: &str,
    dedup_key: &str,
    payload: &serde_json::Value,
) -> Result<bool, GatewayError> {
    let inserted: Option<bool> = sqlx::query_scalar!(
        r#"
        INSERT INTO jobs (kind, dedup_key, payload)
        VALUES ($1, $2, $3)
        ON CONFLICT (dedup_key) DO NOTHING
        RETURNING true AS "inserted!"
        "#,
        kind,
        dedup_key,
        payload,
    )
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

/// Claims up to `limit` pending jobs of `kind`, skipping ones locked by
/// another worker (spec §4.5 "processed by a background worker").
pub async fn claim(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: &str,
    limit: i64,
) -> Result<Vec<JobRow>, GatewayError> {
    let rows = sqlx::query_as!(
        JobRow,
        r#"
        UPDATE jobs
        SET status = 'processing', updated_at = now()
        WHERE id IN (
            SELECT id FROM jobs
            WHERE kind = $1 AND status = 'pending' AND scheduled_at <= now()
            ORDER BY scheduled_at
            LIMIT $2
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, kind, payload, attempts
        "#,
        kind,
        limit,
    )
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}

pub async fn complete(pool: &sqlx::PgPool, id: uuid::Uuid) -> Result<(), GatewayError> {
    sqlx::query!("UPDATE jobs SET status = 'completed', updated_at = now() WHERE id = $1", id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records a failed attempt and reschedules per the retry policy, or
/// marks the job permanently failed (dead-letter) once `max_attempts`
/// is reached (spec §4.5 exhaustion behavior).
pub async fn fail(
    pool: &sqlx::PgPool,
    id: uuid::Uuid,
    error: &str,
    next_attempt_at: chrono::DateTime<chrono::Utc>,
    max_attempts: i32,
) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        UPDATE jobs
        SET attempts = attempts + 1,
            last_error = $2,
            status = CASE WHEN attempts + 1 >= $4 THEN 'dead_letter' ELSE 'pending' END,
            scheduled_at = CASE WHEN attempts + 1 >= $4 THEN scheduled_at ELSE $3 END,
            updated_at = now()
        WHERE id = $1
        "#,
        id,
        error,
        next_attempt_at,
        max_attempts,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Resets jobs stuck in `processing` (a worker crashed mid-job) back to
/// `pending` after the staleness window.
pub async fn reap_stale(pool: &sqlx::PgPool, stale_after: chrono::Duration) -> Result<u64, GatewayError> {
    let cutoff = chrono::Utc::now() - stale_after;
    let result = sqlx::query!(
        "UPDATE jobs SET status = 'pending', updated_at = now() WHERE status = 'processing' AND updated_at < $1",
        cutoff,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn dead_letters(pool: &sqlx::PgPool, limit: i64) -> Result<Vec<JobRow>, GatewayError> {
    let rows = sqlx::query_as!(
        JobRow,
        "SELECT id, kind, payload, attempts FROM jobs WHERE status = 'dead_letter' ORDER BY updated_at DESC LIMIT $1",
        limit,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
