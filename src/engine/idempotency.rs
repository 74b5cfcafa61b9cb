use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::GatewayError;

/// Cached outcome of an idempotent request, replayed verbatim to callers
/// that retry the same idempotency key (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

/// Persisted record behind one idempotency key (spec §3
/// `IdempotencyRecord`). Keyed by `(merchant_id, key)` — the same raw
/// key sent by two different merchants must never collide (spec §4.3
/// `CheckOrReserve(merchant_id, key, fingerprint)`).
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub merchant_id: String,
    pub key: String,
    pub request_hash: String,
    pub response: Option<CachedResponse>,
    pub created_at: DateTime<Utc>,
}

/// Durable storage for idempotency records (spec §4.3). Implemented over
/// Postgres in `infra::postgres::idempotency_repo` using the same
/// `INSERT ... ON CONFLICT DO NOTHING RETURNING` dedup idiom the rest of
/// the system relies on, scoped per merchant.
#[async_trait]
pub trait IdempotencyRepo: Send + Sync {
    /// Attempts to reserve `(merchant_id, key)`. Returns `Some(record)`
    /// only when this call created the row — a concurrent caller that
    /// loses the race gets `None` and must look the existing record up
    /// via [`IdempotencyRepo::find`].
    async fn reserve(
        &self,
        merchant_id: &str,
        key: &str,
        request_hash: &str,
    ) -> Result<Option<IdempotencyRecord>, GatewayError>;
    async fn find(&self, merchant_id: &str, key: &str) -> Result<Option<IdempotencyRecord>, GatewayError>;
    async fn store_result(&self, merchant_id: &str, key: &str, response: CachedResponse)
    -> Result<(), GatewayError>;
    async fn release(&self, merchant_id: &str, key: &str) -> Result<(), GatewayError>;
}

/// What the caller should do with an incoming request carrying an
/// `Idempotency-Key` (spec §4.3).
#[derive(Debug)]
pub enum IdempotencyDecision {
    /// No prior record — proceed and call [`IdempotencyRepo::store_result`]
    /// when done.
    Proceed,
    /// A prior call with a *different* request body reused this key.
    Conflict,
    /// A prior call completed; replay its response rather than
    /// re-executing any side effect.
    Replay(CachedResponse),
    /// A prior call reserved this key but has not completed yet — the
    /// caller should reject with a 409 rather than double-execute.
    InFlight,
}

/// Single-flight dedup: reserve `(merchant_id, key)`, and if a record
/// already exists decide whether to replay, conflict, or treat the
/// request as still in flight (spec §4.3 step 1).
pub async fn check_or_reserve(
    repo: &dyn IdempotencyRepo,
    merchant_id: &str,
    key: &str,
    request_hash: &str,
) -> Result<IdempotencyDecision, GatewayError> {
    if repo.reserve(merchant_id, key, request_hash).await?.is_some() {
        return Ok(IdempotencyDecision::Proceed);
    }

    let existing = repo.find(merchant_id, key).await?.ok_or_else(|| {
        GatewayError::Integrity(format!("idempotency key {merchant_id}/{key} vanished after reservation race"))
    })?;

    if existing.request_hash != request_hash {
        return Ok(IdempotencyDecision::Conflict);
    }

    match existing.response {
        Some(response) => Ok(IdempotencyDecision::Replay(response)),
        None => Ok(IdempotencyDecision::InFlight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRepo {
        records: Mutex<HashMap<(String, String), IdempotencyRecord>>,
    }

    #[async_trait]
    impl IdempotencyRepo for FakeRepo {
        async fn reserve(
            &self,
            merchant_id: &str,
            key: &str,
            request_hash: &str,
        ) -> Result<Option<IdempotencyRecord>, GatewayError> {
            let mut records = self.records.lock().unwrap();
            let composite = (merchant_id.to_string(), key.to_string());
            if records.contains_key(&composite) {
                return Ok(None);
            }
            let record = IdempotencyRecord {
                merchant_id: merchant_id.to_string(),
                key: key.to_string(),
                request_hash: request_hash.to_string(),
                response: None,
                created_at: Utc::now(),
            };
            records.insert(composite, record.clone());
            Ok(Some(record))
        }

        async fn find(&self, merchant_id: &str, key: &str) -> Result<Option<IdempotencyRecord>, GatewayError> {
            Ok(self.records.lock().unwrap().get(&(merchant_id.to_string(), key.to_string())).cloned())
        }

        async fn store_result(
            &self,
            merchant_id: &str,
            key: &str,
            response: CachedResponse,
        ) -> Result<(), GatewayError> {
            if let Some(record) = self.records.lock().unwrap().get_mut(&(merchant_id.to_string(), key.to_string())) {
                record.response = Some(response);
            }
            Ok(())
        }

        async fn release(&self, merchant_id: &str, key: &str) -> Result<(), GatewayError> {
            self.records.lock().unwrap().remove(&(merchant_id.to_string(), key.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn fresh_key_proceeds() {
        let repo = FakeRepo::default();
        let decision = check_or_reserve(&repo, "merchant_1", "key1", "hash1").await.unwrap();
        assert!(matches!(decision, IdempotencyDecision::Proceed));
    }

    #[tokio::test]
    async fn same_key_same_hash_in_flight_is_reported() {
        let repo = FakeRepo::default();
        check_or_reserve(&repo, "merchant_1", "key1", "hash1").await.unwrap();
        let decision = check_or_reserve(&repo, "merchant_1", "key1", "hash1").await.unwrap();
        assert!(matches!(decision, IdempotencyDecision::InFlight));
    }

    #[tokio::test]
    async fn same_key_different_hash_conflicts() {
        let repo = FakeRepo::default();
        check_or_reserve(&repo, "merchant_1", "key1", "hash1").await.unwrap();
        let decision = check_or_reserve(&repo, "merchant_1", "key1", "hash2").await.unwrap();
        assert!(matches!(decision, IdempotencyDecision::Conflict));
    }

    #[tokio::test]
    async fn completed_key_replays_cached_response() {
        let repo = FakeRepo::default();
        check_or_reserve(&repo, "merchant_1", "key1", "hash1").await.unwrap();
        repo.store_result(
            "merchant_1",
            "key1",
            CachedResponse { status_code: 201, body: serde_json::json!({"id": "abc"}) },
        )
        .await
        .unwrap();
        let decision = check_or_reserve(&repo, "merchant_1", "key1", "hash1").await.unwrap();
        match decision {
            IdempotencyDecision::Replay(response) => assert_eq!(response.status_code, 201),
            other => panic!("expected Replay, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn distinct_merchants_do_not_collide_on_the_same_key() {
        let repo = FakeRepo::default();
        let first = check_or_reserve(&repo, "merchant_1", "K1", "hash1").await.unwrap();
        assert!(matches!(first, IdempotencyDecision::Proceed));
        let second = check_or_reserve(&repo, "merchant_2", "K1", "hash1").await.unwrap();
        assert!(matches!(second, IdempotencyDecision::Proceed));
    }
}
