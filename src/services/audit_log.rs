//! Thin write-path wrapper over `infra::postgres::audit_repo` (spec
//! §4.9). Every caller goes through here rather than the repo directly
//! so redaction can never be forgotten at a call site.

use crate::domain::audit::NewAuditEntry;
use crate::domain::error::GatewayError;
use crate::infra::postgres::audit_repo;

pub async fn record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: NewAuditEntry,
) -> Result<(), GatewayError> {
    audit_repo::insert_audit_entry(tx, &entry.redacted()).await
}

pub async fn record_pooled(pool: &sqlx::PgPool, entry: NewAuditEntry) -> Result<(), GatewayError> {
    audit_repo::insert_audit_entry_pooled(pool, &entry.redacted()).await
}
