use crate::domain::audit::NewAuditEntry;
use crate::domain::error::GatewayError;

/// Appends one redacted audit entry. `entry` must already have had
/// [`NewAuditEntry::redacted`] applied — this layer only persists, it
/// never redacts (spec §4.9: redaction happens before the row is
/// constructed, not as a storage-layer afterthought).
pub async fn insert_audit_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &NewAuditEntry,
) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        INSERT INTO audit_log
            (id, entity_type, entity_id, external_id, event_id, action, actor, correlation_id, detail)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
        entry.id,
        entry.entity_type,
        entry.entity_id,
        entry.external_id,
        entry.event_id,
        entry.action,
        entry.actor,
        entry.correlation_id,
        entry.detail,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_audit_entry_pooled(
    pool: &sqlx::PgPool,
    entry: &NewAuditEntry,
) -> Result<(), GatewayError> {
    sqlx::query!(
        r#"
        INSERT INTO audit_log
            (id, entity_type, entity_id, external_id, event_id, action, actor, correlation_id, detail)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
        entry.id,
        entry.entity_type,
        entry.entity_id,
        entry.external_id,
        entry.event_id,
        entry.action,
        entry.actor,
        entry.correlation_id,
        entry.detail,
    )
    .execute(pool)
    .await?;
    Ok(())
}
