//! Authorization Orchestrator (spec §4.1): idempotency check, validation,
//! tokenization, fraud evaluation, optional 3-D Secure, PSP routing,
//! persistence, and event publication, wired as a saga so a failure after
//! a successful authorization triggers a best-effort void instead of
//! leaving an orphaned charge. Capture and void of an already-authorized
//! payment are plain operations alongside it, not part of the saga.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::collaborators::fraud::{FraudContext, FraudDecision, FraudService, RuleBasedFraud};
use crate::collaborators::psp::{PspClient, PspOutcome};
use crate::collaborators::three_ds::ThreeDsOutcome;
use crate::collaborators::three_ds::ThreeDsService;
use crate::collaborators::tokenization::Tokenizer;
use crate::config::Deadlines;
use crate::domain::card::{CardToken, RawCard};
use crate::domain::error::GatewayError;
use crate::domain::event::{Event, EventType};
use crate::domain::id::{CorrelationId, ExternalId, IdempotencyKey, MerchantId, PaymentId};
use crate::domain::money::Money;
use crate::domain::payment::{DeclineReason, NewPaymentParams, Payment, PaymentStatus};
use crate::engine::circuit_breaker::CircuitRegistry;
use crate::engine::event_bus::EventBus;
use crate::engine::idempotency::{CachedResponse, IdempotencyDecision, IdempotencyRepo, check_or_reserve};
use crate::engine::psp_router::{route_authorize, RoutingResult};
use crate::engine::retry::RetryPolicy;
use crate::engine::saga::{run_saga, SagaResult, SagaStep};
use crate::infra::postgres::{job_repo, payment_repo};
use crate::services::audit_log;

/// Runs `fut`, mapping an elapsed deadline to a transient [`GatewayError`]
/// (spec §5: "a deadline miss is classified transient" per §4.5).
async fn with_deadline<T>(
    deadline: Duration,
    label: &str,
    fut: impl std::future::Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Transient(format!("{label} exceeded {deadline:?} deadline"))),
    }
}

/// Everything one authorization attempt accumulates as it moves through
/// the saga. Collaborators live on the steps, not here — this only holds
/// the mutable domain state each step reads or writes.
struct AuthorizationContext {
    merchant_id: MerchantId,
    external_id: ExternalId,
    money: Money,
    raw_card: Option<RawCard>,
    card_bin: String,
    correlation_id: CorrelationId,
    trace_id: String,

    card_token: Option<CardToken>,
    degraded_fraud_scoring: bool,
    fraud_score: Option<f64>,
    require_3ds: bool,
    three_ds_outcome: Option<ThreeDsOutcome>,
    routing_result: Option<RoutingResult>,
    /// Set as soon as any pipeline stage reaches a business decline. Once
    /// set, later stages skip their own work but still run — a decline
    /// still has to be persisted and published, it's just not a saga
    /// failure (spec §4.1: fraud block, failed auth, and PSP decline are
    /// business outcomes, not faults that need compensating).
    terminal_decline: Option<DeclineReason>,
    payment: Option<Payment>,
}

struct TokenizeStep {
    tokenizer: Arc<dyn Tokenizer>,
    deadlines: Deadlines,
}

#[async_trait]
impl SagaStep<AuthorizationContext> for TokenizeStep {
    fn name(&self) -> &'static str {
        "tokenize"
    }

    async fn forward(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        let card = ctx
            .raw_card
            .take()
            .ok_or_else(|| GatewayError::Integrity("card material missing at tokenize step".into()))?;
        let token = with_deadline(self.deadlines.cache, "tokenize", self.tokenizer.tokenize(&card)).await?;
        ctx.card_token = Some(token);
        Ok(())
    }
}

struct FraudStep {
    fraud: Arc<dyn FraudService>,
    fallback: Arc<RuleBasedFraud>,
    deadlines: Deadlines,
}

#[async_trait]
impl SagaStep<AuthorizationContext> for FraudStep {
    fn name(&self) -> &'static str {
        "fraud_evaluation"
    }

    async fn forward(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        let token = ctx.card_token.as_ref().expect("tokenize runs before fraud_evaluation");
        let fraud_ctx = FraudContext {
            merchant_id: ctx.merchant_id.as_str().to_string(),
            card_token: token.token.clone(),
            amount: ctx.money.clone(),
            card_bin: ctx.card_bin.clone(),
        };

        let result = match with_deadline(self.deadlines.fraud_or_three_ds, "fraud_evaluation", self.fraud.evaluate(&fraud_ctx)).await {
            Ok(result) => result,
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "fraud service unavailable, degrading to rule-based scoring");
                ctx.degraded_fraud_scoring = true;
                self.fallback.evaluate(&fraud_ctx).await?
            }
            Err(e) => return Err(e),
        };

        ctx.require_3ds = result.require_3ds;
        ctx.fraud_score = Some(result.score);
        if result.decision == FraudDecision::Block {
            ctx.terminal_decline = Some(DeclineReason::FraudBlock);
        }
        Ok(())
    }
}

struct ThreeDsStep {
    three_ds: Arc<dyn ThreeDsService>,
    deadlines: Deadlines,
}

#[async_trait]
impl SagaStep<AuthorizationContext> for ThreeDsStep {
    fn name(&self) -> &'static str {
        "three_ds"
    }

    async fn forward(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        if ctx.terminal_decline.is_some() || !ctx.require_3ds {
            return Ok(());
        }
        let token = ctx.card_token.as_ref().expect("tokenize runs before three_ds");
        let challenge =
            with_deadline(self.deadlines.fraud_or_three_ds, "three_ds_initiate", self.three_ds.initiate(&token.token)).await?;
        let outcome = with_deadline(self.deadlines.fraud_or_three_ds, "three_ds_complete", self.three_ds.complete(&challenge)).await?;
        if !outcome.authenticated {
            ctx.terminal_decline = Some(DeclineReason::AuthenticationFailed);
        }
        ctx.three_ds_outcome = Some(outcome);
        Ok(())
    }
}

struct PspAuthorizeStep {
    psps: Vec<Arc<dyn PspClient>>,
    circuits: Arc<CircuitRegistry>,
    pool: sqlx::PgPool,
    retry_policy: RetryPolicy,
    deadline: Duration,
}

#[async_trait]
impl SagaStep<AuthorizationContext> for PspAuthorizeStep {
    fn name(&self) -> &'static str {
        "psp_authorize"
    }

    async fn forward(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        if ctx.terminal_decline.is_some() {
            return Ok(());
        }
        let token = ctx.card_token.as_ref().expect("tokenize runs before psp_authorize");
        let routing = route_authorize(
            &self.psps,
            &self.circuits,
            &ctx.money,
            &token.token,
            &self.retry_policy,
            self.deadline,
        )
        .await?;
        if let PspOutcome::HardDeclined { reason, .. } = &routing.outcome {
            ctx.terminal_decline = Some(reason.clone());
        }
        ctx.routing_result = Some(routing);
        Ok(())
    }

    /// Runs only when a later step (persist) failed after this one
    /// succeeded. Enqueues a best-effort void rather than calling the PSP
    /// synchronously — the webhook/settlement worker loop drains it like
    /// any other job (spec §4.1 "step 7 failure after step 6 success
    /// enqueues a best-effort void compensation task").
    async fn compensate(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        let Some(routing) = &ctx.routing_result else {
            return Ok(());
        };
        if let PspOutcome::Approved { psp_reference } = &routing.outcome {
            job_repo::enqueue(
                &self.pool,
                "void_authorization",
                &format!("void:{psp_reference}"),
                &serde_json::json!({ "psp_name": routing.psp_name, "psp_reference": psp_reference }),
            )
            .await?;
        }
        Ok(())
    }
}

struct PersistStep {
    pool: sqlx::PgPool,
}

#[async_trait]
impl SagaStep<AuthorizationContext> for PersistStep {
    fn name(&self) -> &'static str {
        "persist"
    }

    async fn forward(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        let token = ctx.card_token.as_ref().expect("tokenize runs before persist").clone();

        let mut payment = Payment::new(NewPaymentParams {
            external_id: ctx.external_id.clone(),
            merchant_id: ctx.merchant_id.clone(),
            money: ctx.money.clone(),
            card_token: token.token.clone(),
            card_last_four: token.last_four.clone(),
            card_brand: token.brand,
        });
        payment.fraud_score = ctx.fraud_score;
        payment.degraded_fraud_scoring = ctx.degraded_fraud_scoring;
        payment.three_ds_outcome = ctx
            .three_ds_outcome
            .as_ref()
            .map(|o| if o.authenticated { "authenticated" } else { "failed" }.to_string());

        match (&ctx.terminal_decline, &ctx.routing_result) {
            (Some(reason), _) => {
                payment.status = PaymentStatus::Declined;
                payment.decline_reason = Some(reason.clone());
            }
            (None, Some(routing)) => {
                payment.status = PaymentStatus::Authorized;
                payment.authorized_at = Some(chrono::Utc::now());
                payment.psp_name = Some(routing.psp_name.clone());
                if let PspOutcome::Approved { psp_reference } = &routing.outcome {
                    payment.psp_reference = Some(psp_reference.clone());
                }
            }
            (None, None) => {
                return Err(GatewayError::Integrity(
                    "persist reached with neither a decline nor a routing result".into(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;
        payment_repo::insert_payment(&mut tx, &payment).await?;
        let entry = payment.audit_entry("orchestrator", "authorize", &ctx.correlation_id);
        audit_log::record(&mut tx, entry).await?;
        tx.commit().await?;

        ctx.payment = Some(payment);
        Ok(())
    }
}

struct PublishEventStep {
    bus: Arc<EventBus>,
}

#[async_trait]
impl SagaStep<AuthorizationContext> for PublishEventStep {
    fn name(&self) -> &'static str {
        "publish_event"
    }

    async fn forward(&self, ctx: &mut AuthorizationContext) -> Result<(), GatewayError> {
        let payment = ctx.payment.as_ref().expect("persist runs before publish_event");
        let event_type = match payment.status {
            PaymentStatus::Authorized => EventType::PaymentAuthorized,
            PaymentStatus::Declined => EventType::PaymentDeclined,
            _ => EventType::PaymentFailed,
        };
        let event = Event::new(
            event_type,
            ctx.correlation_id.as_str().to_string(),
            ctx.trace_id.clone(),
            payment.id.as_uuid().to_string(),
            serde_json::json!({
                "payment_id": payment.id.as_uuid(),
                "merchant_id": payment.merchant_id.as_str(),
                "external_id": payment.external_id.as_str(),
                "status": payment.status.as_str(),
                "amount": payment.money.amount().cents(),
                "currency": payment.money.currency().as_str(),
            }),
        );
        self.bus.publish(event).await
    }
}

/// Incoming authorization request. `idempotency_key` is optional per spec
/// §4.3 — callers who omit it get no dedup protection.
pub struct AuthorizeRequest {
    pub merchant_id: MerchantId,
    pub external_id: ExternalId,
    pub money: Money,
    pub card: RawCard,
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Client-safe response shape (spec §7: "responses always mask PAN, never
/// return CVV, always include trace_id").
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct AuthorizeResponse {
    pub payment_id: String,
    pub external_id: String,
    pub status: String,
    pub masked_card: String,
    pub decline_reason: Option<String>,
    pub trace_id: String,
}

impl AuthorizeResponse {
    fn from_payment(payment: &Payment, trace_id: &str) -> Self {
        Self {
            payment_id: payment.id.as_uuid().to_string(),
            external_id: payment.external_id.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            masked_card: payment.masked_card(),
            decline_reason: payment.decline_reason.as_ref().map(|r| r.as_str().to_string()),
            trace_id: trace_id.to_string(),
        }
    }
}

fn compute_request_hash(req: &AuthorizeRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(req.external_id.as_str().as_bytes());
    hasher.update(req.merchant_id.as_str().as_bytes());
    hasher.update(req.money.amount().cents().to_le_bytes());
    hasher.update(req.money.currency().as_str().as_bytes());
    hasher.update(req.card.last_four().as_bytes());
    hex::encode(hasher.finalize())
}

/// Wires the authorization pipeline, capture, and void against one set of
/// collaborators and a connection pool. One instance is shared across
/// requests (spec §5 "shared circuit-breaker/idempotency state").
pub struct Orchestrator {
    pool: sqlx::PgPool,
    idempotency: Arc<dyn IdempotencyRepo>,
    tokenizer: Arc<dyn Tokenizer>,
    fraud: Arc<dyn FraudService>,
    fraud_fallback: Arc<RuleBasedFraud>,
    three_ds: Arc<dyn ThreeDsService>,
    psps: Vec<Arc<dyn PspClient>>,
    circuits: Arc<CircuitRegistry>,
    event_bus: Arc<EventBus>,
    psp_retry_policy: RetryPolicy,
    deadlines: Deadlines,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: sqlx::PgPool,
        idempotency: Arc<dyn IdempotencyRepo>,
        tokenizer: Arc<dyn Tokenizer>,
        fraud: Arc<dyn FraudService>,
        fraud_fallback: Arc<RuleBasedFraud>,
        three_ds: Arc<dyn ThreeDsService>,
        psps: Vec<Arc<dyn PspClient>>,
        circuits: Arc<CircuitRegistry>,
        event_bus: Arc<EventBus>,
        psp_retry_policy: RetryPolicy,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            pool,
            idempotency,
            tokenizer,
            fraud,
            fraud_fallback,
            three_ds,
            psps,
            circuits,
            event_bus,
            psp_retry_policy,
            deadlines,
        }
    }

    fn psp_by_name(&self, name: Option<&str>) -> Result<Arc<dyn PspClient>, GatewayError> {
        let name = name.ok_or_else(|| GatewayError::Integrity("payment missing psp_name".into()))?;
        self.psps
            .iter()
            .find(|p| p.identity().name == name)
            .cloned()
            .ok_or_else(|| GatewayError::Integrity(format!("unknown psp: {name}")))
    }

    /// Full spec §4.1 pipeline. Idempotency reservation and final
    /// store/release wrap the saga rather than being modeled as a step in
    /// it: unlike the other stages, the idempotency decision short-circuits
    /// the whole flow (replay/conflict/in-flight) before the saga starts,
    /// and its cleanup runs on every exit path, not only on failure.
    pub async fn authorize(&self, req: AuthorizeRequest) -> Result<AuthorizeResponse, GatewayError> {
        let trace_id = uuid::Uuid::now_v7().to_string();
        let correlation_id = CorrelationId::new();
        let request_hash = compute_request_hash(&req);
        let idempotency_key = req.idempotency_key.clone();

        let merchant_id = req.merchant_id.as_str().to_string();

        if let Some(key) = &idempotency_key {
            match check_or_reserve(self.idempotency.as_ref(), &merchant_id, key.as_str(), &request_hash).await? {
                IdempotencyDecision::Proceed => {}
                IdempotencyDecision::Conflict => {
                    return Err(GatewayError::IdempotencyConflict(format!(
                        "idempotency key {} was already used with a different request body",
                        key.as_str()
                    )));
                }
                IdempotencyDecision::InFlight => return Err(GatewayError::IdempotencyBusy),
                IdempotencyDecision::Replay(cached) => {
                    return serde_json::from_value(cached.body).map_err(GatewayError::from);
                }
            }
        }

        let outcome = self.run_authorization(req, correlation_id, trace_id).await;

        match (&outcome, &idempotency_key) {
            (Ok(response), Some(key)) => {
                let body = serde_json::to_value(response)?;
                self.idempotency
                    .store_result(&merchant_id, key.as_str(), CachedResponse { status_code: 201, body })
                    .await?;
            }
            (Err(e), Some(key)) if !e.is_transient() => {
                self.idempotency.release(&merchant_id, key.as_str()).await.ok();
            }
            _ => {}
        }

        outcome
    }

    async fn run_authorization(
        &self,
        req: AuthorizeRequest,
        correlation_id: CorrelationId,
        trace_id: String,
    ) -> Result<AuthorizeResponse, GatewayError> {
        if req.money.amount().cents() <= 0 {
            return Err(GatewayError::Validation("authorization amount must be positive".into()));
        }
        let now = chrono::Utc::now();
        req.card.validate(now.year() as u32, now.month())?;

        let card_bin: String = req.card.pan.chars().filter(|c| c.is_ascii_digit()).take(6).collect();

        let mut ctx = AuthorizationContext {
            merchant_id: req.merchant_id,
            external_id: req.external_id,
            money: req.money,
            raw_card: Some(req.card),
            card_bin,
            correlation_id,
            trace_id: trace_id.clone(),
            card_token: None,
            degraded_fraud_scoring: false,
            fraud_score: None,
            require_3ds: false,
            three_ds_outcome: None,
            routing_result: None,
            terminal_decline: None,
            payment: None,
        };

        let steps: Vec<Box<dyn SagaStep<AuthorizationContext>>> = vec![
            Box::new(TokenizeStep { tokenizer: self.tokenizer.clone(), deadlines: self.deadlines }),
            Box::new(FraudStep {
                fraud: self.fraud.clone(),
                fallback: self.fraud_fallback.clone(),
                deadlines: self.deadlines,
            }),
            Box::new(ThreeDsStep { three_ds: self.three_ds.clone(), deadlines: self.deadlines }),
            Box::new(PspAuthorizeStep {
                psps: self.psps.clone(),
                circuits: self.circuits.clone(),
                pool: self.pool.clone(),
                retry_policy: self.psp_retry_policy,
                deadline: self.deadlines.psp,
            }),
            Box::new(PersistStep { pool: self.pool.clone() }),
            Box::new(PublishEventStep { bus: self.event_bus.clone() }),
        ];

        match run_saga(&steps, &mut ctx).await {
            SagaResult::Success(_) => {
                let payment = ctx.payment.expect("persist always sets payment on a successful run");
                Ok(AuthorizeResponse::from_payment(&payment, &trace_id))
            }
            SagaResult::Failed(outcome) => {
                tracing::error!(
                    failed_step = outcome.failed_step.unwrap_or("unknown"),
                    compensated = ?outcome.compensated,
                    failed_compensations = ?outcome.failed_compensations,
                    "authorization pipeline failed",
                );
                Err(GatewayError::Transient(format!(
                    "authorization pipeline failed at step {}",
                    outcome.failed_step.unwrap_or("unknown")
                )))
            }
        }
    }

    pub async fn capture(&self, payment_id: PaymentId) -> Result<AuthorizeResponse, GatewayError> {
        let payment = payment_repo::find_by_id(&self.pool, payment_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.status != PaymentStatus::Authorized {
            return Err(GatewayError::BusinessDecline {
                reason: format!("cannot capture payment in status {}", payment.status),
            });
        }

        let psp = self.psp_by_name(payment.psp_name.as_deref())?;
        let psp_reference = payment
            .psp_reference
            .as_deref()
            .ok_or_else(|| GatewayError::Integrity("authorized payment missing psp_reference".into()))?;

        match with_deadline(self.deadlines.psp, "psp_capture", psp.capture(psp_reference, &payment.money)).await? {
            PspOutcome::Approved { .. } => {
                let mut tx = self.pool.begin().await?;
                payment_repo::advance_status(&mut tx, payment.id, PaymentStatus::Captured, None, None, None).await?;
                let entry = payment.audit_entry("orchestrator", "capture", &CorrelationId::new());
                audit_log::record(&mut tx, entry).await?;
                tx.commit().await?;

                self.publish_lifecycle_event(EventType::PaymentCaptured, &payment).await?;

                let mut captured = payment;
                captured.status = PaymentStatus::Captured;
                Ok(AuthorizeResponse::from_payment(&captured, &uuid::Uuid::now_v7().to_string()))
            }
            PspOutcome::HardDeclined { reason, .. } => {
                Err(GatewayError::BusinessDecline { reason: reason.as_str().to_string() })
            }
            PspOutcome::Transient(msg) => Err(GatewayError::Transient(msg)),
        }
    }

    pub async fn void(&self, payment_id: PaymentId) -> Result<AuthorizeResponse, GatewayError> {
        let payment = payment_repo::find_by_id(&self.pool, payment_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("payment {payment_id} not found")))?;

        if payment.status != PaymentStatus::Authorized {
            return Err(GatewayError::BusinessDecline {
                reason: format!("cannot void payment in status {}", payment.status),
            });
        }

        let psp = self.psp_by_name(payment.psp_name.as_deref())?;
        let psp_reference = payment
            .psp_reference
            .as_deref()
            .ok_or_else(|| GatewayError::Integrity("authorized payment missing psp_reference".into()))?;
        with_deadline(self.deadlines.psp, "psp_void", psp.void(psp_reference)).await?;

        let mut tx = self.pool.begin().await?;
        payment_repo::advance_status(&mut tx, payment.id, PaymentStatus::Cancelled, None, None, None).await?;
        let entry = payment.audit_entry("orchestrator", "void", &CorrelationId::new());
        audit_log::record(&mut tx, entry).await?;
        tx.commit().await?;

        self.publish_lifecycle_event(EventType::PaymentCancelled, &payment).await?;

        let mut voided = payment;
        voided.status = PaymentStatus::Cancelled;
        Ok(AuthorizeResponse::from_payment(&voided, &uuid::Uuid::now_v7().to_string()))
    }

    async fn publish_lifecycle_event(&self, event_type: EventType, payment: &Payment) -> Result<(), GatewayError> {
        let event = Event::new(
            event_type,
            CorrelationId::new().as_str().to_string(),
            uuid::Uuid::now_v7().to_string(),
            payment.id.as_uuid().to_string(),
            serde_json::json!({
                "payment_id": payment.id.as_uuid(),
                "merchant_id": payment.merchant_id.as_str(),
            }),
        );
        self.event_bus.publish(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fraud::FraudThresholds;
    use crate::domain::money::{Currency, MoneyAmount};
    use std::collections::HashSet;

    fn valid_card() -> RawCard {
        RawCard { pan: "4242424242424242".to_string(), expiry_month: 12, expiry_year: 2099, cvv: "123".to_string() }
    }

    fn money(cents: i64) -> Money {
        Money::new(MoneyAmount::new(cents).unwrap(), Currency::Usd)
    }

    #[test]
    fn request_hash_is_deterministic() {
        let req = AuthorizeRequest {
            merchant_id: MerchantId::new("m_1").unwrap(),
            external_id: ExternalId::new("ext_1").unwrap(),
            money: money(1000),
            card: valid_card(),
            idempotency_key: None,
        };
        let h1 = compute_request_hash(&req);
        let h2 = compute_request_hash(&req);
        assert_eq!(h1, h2);
    }

    fn make_fraud() -> Arc<RuleBasedFraud> {
        Arc::new(RuleBasedFraud::new(FraudThresholds::default(), HashSet::new(), 500_000))
    }

    // The full authorize/capture/void pipeline needs a live Postgres pool
    // for the persist step; that coverage lives in tests/authorize_flow.rs
    // against a real database rather than faking `sqlx::PgPool` here.

    #[tokio::test]
    async fn large_amount_forces_required_3ds_flag() {
        let fraud = make_fraud();
        let ctx = FraudContext {
            merchant_id: "m_1".into(),
            card_token: "tok_1".into(),
            amount: money(600_000),
            card_bin: "424242".into(),
        };
        let result = fraud.evaluate(&ctx).await.unwrap();
        assert!(result.require_3ds);
    }
}
