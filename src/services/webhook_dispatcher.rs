//! Outbound webhook delivery (spec §4.10): HMAC-sign every terminal
//! payment/refund/settlement event and POST it to the merchant's
//! configured endpoint, retrying non-2xx responses with the same
//! bounded exponential backoff as the rest of the system.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::collaborators::webhook_transport::{WebhookDelivery, WebhookTransport};
use crate::domain::error::GatewayError;
use crate::domain::event::Event;
use crate::engine::event_bus::WebhookSink;
use crate::engine::retry::{RetryDecision, RetryPolicy};
use crate::infra::postgres::job_repo;

type HmacSha256 = Hmac<Sha256>;

const JOB_KIND: &str = "webhook_delivery";

/// Where and with what secret to sign deliveries for one merchant
/// (spec §4.10 "looks up the merchant's endpoint... using the
/// merchant's secret").
#[derive(Debug, Clone)]
pub struct MerchantWebhookConfig {
    pub endpoint: String,
    pub secret: String,
}

/// Default bounded retry count for webhook delivery (spec §4.10
/// "up to a bounded attempt count (default 10)"), overriding the
/// system-wide default of 5 (spec §6 retry defaults).
pub fn default_retry_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 10, ..RetryPolicy::default() }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchSummary {
    pub delivered: u32,
    pub retried: u32,
    pub dead_lettered: u32,
}

pub struct WebhookDispatcher {
    pool: sqlx::PgPool,
    transport: Arc<dyn WebhookTransport>,
    merchants: HashMap<String, MerchantWebhookConfig>,
    retry_policy: RetryPolicy,
}

impl WebhookDispatcher {
    pub fn new(
        pool: sqlx::PgPool,
        transport: Arc<dyn WebhookTransport>,
        merchants: HashMap<String, MerchantWebhookConfig>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self { pool, transport, merchants, retry_policy }
    }

    /// Queues `event` for delivery. Dedup key is the event id, so a
    /// publisher that retries its own publish never double-enqueues a
    /// delivery (spec §4.6 "idempotent consume").
    pub async fn enqueue(&self, event: &Event) -> Result<bool, GatewayError> {
        let payload = serde_json::to_value(event)?;
        job_repo::enqueue(&self.pool, JOB_KIND, &format!("webhook:{}", event.event_id), &payload).await
    }

    /// Drains up to `limit` queued deliveries (spec §5 "background
    /// schedulers... run as separate worker pools"). Non-2xx and
    /// transport errors are treated identically: reschedule per the
    /// retry policy, or dead-letter once exhausted. A dead-lettered
    /// delivery never blocks the rest of the batch.
    pub async fn dispatch_pending(&self, limit: i64) -> Result<DispatchSummary, GatewayError> {
        let mut tx = self.pool.begin().await?;
        let jobs = job_repo::claim(&mut tx, JOB_KIND, limit).await?;
        tx.commit().await?;

        let mut summary = DispatchSummary::default();
        for job in jobs {
            match self.deliver_one(&job.payload).await {
                Ok(true) => {
                    job_repo::complete(&self.pool, job.id).await?;
                    summary.delivered += 1;
                }
                Ok(false) => {
                    self.reschedule_or_dead_letter(job.id, job.attempts, "non-2xx response", &mut summary).await?;
                }
                Err(err) => {
                    self.reschedule_or_dead_letter(job.id, job.attempts, &err.to_string(), &mut summary).await?;
                }
            }
        }
        Ok(summary)
    }

    async fn reschedule_or_dead_letter(
        &self,
        job_id: uuid::Uuid,
        attempts_so_far: i32,
        error: &str,
        summary: &mut DispatchSummary,
    ) -> Result<(), GatewayError> {
        let attempt = attempts_so_far as u32 + 1;
        let next_attempt_at = match self.retry_policy.decide(attempt) {
            RetryDecision::RetryAfter(delay) => {
                chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::seconds(60))
            }
            RetryDecision::Exhausted => chrono::Utc::now(),
        };
        job_repo::fail(&self.pool, job_id, error, next_attempt_at, self.retry_policy.max_attempts as i32).await?;

        if attempt >= self.retry_policy.max_attempts {
            tracing::warn!(job_id = %job_id, error, "webhook delivery dead-lettered");
            summary.dead_lettered += 1;
        } else {
            summary.retried += 1;
        }
        Ok(())
    }

    async fn deliver_one(&self, payload: &serde_json::Value) -> Result<bool, GatewayError> {
        let event: Event = serde_json::from_value(payload.clone())?;
        let merchant_id = event
            .payload
            .get("merchant_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::Integrity("webhook event missing merchant_id".into()))?;
        let config = self
            .merchants
            .get(merchant_id)
            .ok_or_else(|| GatewayError::Integrity(format!("no webhook endpoint configured for merchant {merchant_id}")))?;

        let body = serde_json::to_vec(&event)?;
        let signature = sign_payload(&config.secret, &body)?;

        let status = self
            .transport
            .deliver(WebhookDelivery { endpoint: config.endpoint.clone(), payload: body, signature_header: signature })
            .await?;

        Ok((200..300).contains(&status))
    }
}

#[async_trait]
impl WebhookSink for WebhookDispatcher {
    async fn enqueue(&self, event: &Event) -> Result<(), GatewayError> {
        WebhookDispatcher::enqueue(self, event).await?;
        Ok(())
    }
}

/// HMAC-SHA256 over the exact payload bytes, hex-encoded for the
/// `X-Webhook-Signature` header (spec §4.10, §8 property 15).
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Integrity(format!("invalid webhook secret: {e}")))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a received signature against the payload (used by tests and
/// by any merchant-side reference client in `tests/`).
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    match sign_payload(secret, payload) {
        Ok(expected) => expected == signature,
        Err(_) => false,
    }
}
