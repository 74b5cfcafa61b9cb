use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::psp::{PspClient, PspOutcome};
use crate::domain::error::GatewayError;
use crate::domain::money::Money;
use crate::domain::payment::DeclineReason;
use crate::engine::circuit_breaker::CircuitRegistry;
use crate::engine::retry::{RetryDecision, RetryPolicy};

/// Result of routing an authorization across the configured PSPs (spec
/// §4.4). `attempts` records every connector that was tried, in order,
/// for audit purposes even when a later attempt succeeds.
#[derive(Debug)]
pub struct RoutingResult {
    pub outcome: PspOutcome,
    pub psp_name: String,
    pub attempts: Vec<RoutingAttempt>,
}

#[derive(Debug, Clone)]
pub struct RoutingAttempt {
    pub psp_name: String,
    pub skipped_circuit_open: bool,
    pub outcome: Option<PspOutcome>,
}

/// Calls `psp.authorize`, retrying a transient outcome per `retry_policy`
/// before it is handed back to the caller for circuit accounting /
/// failover (spec §4.4 step 3 "dispatch through the Retry Engine (§4.5)
/// with a per-PSP policy" — a transient outcome only counts against the
/// connector once this budget is exhausted). Each attempt is bounded by
/// `deadline`; a deadline miss is treated the same as any other
/// transient failure (spec §5).
async fn authorize_with_retry(
    psp: &dyn PspClient,
    amount: &Money,
    card_token: &str,
    retry_policy: &RetryPolicy,
    deadline: Duration,
) -> Result<PspOutcome, GatewayError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(deadline, psp.authorize(amount, card_token)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Transient(format!(
                "psp {} authorize exceeded {:?} deadline",
                psp.identity().name,
                deadline
            ))),
        };

        let retry_after = match &result {
            Ok(PspOutcome::Transient(_)) => Some(retry_policy.decide(attempt)),
            Err(e) if e.is_transient() => Some(retry_policy.decide(attempt)),
            _ => None,
        };

        match retry_after {
            Some(RetryDecision::RetryAfter(delay)) => {
                tokio::time::sleep(delay).await;
            }
            Some(RetryDecision::Exhausted) | None => return result,
        }
    }
}

/// Tries connectors in ascending priority order, skipping any whose
/// circuit is open and failing over to the next on a transient error
/// (spec §4.4 "ordered failover"). A hard decline stops the routing
/// immediately — it is a business outcome, not a connector fault, so
/// trying the next PSP would just be shopping for a different answer to
/// the same declined card (spec §4.4, §8 property on decline
/// classification).
#[allow(clippy::too_many_arguments)]
pub async fn route_authorize(
    psps: &[Arc<dyn PspClient>],
    circuits: &CircuitRegistry,
    amount: &Money,
    card_token: &str,
    retry_policy: &RetryPolicy,
    deadline: Duration,
) -> Result<RoutingResult, GatewayError> {
    let mut ordered: Vec<&Arc<dyn PspClient>> = psps.iter().collect();
    ordered.sort_by_key(|p| p.identity().priority);

    let mut attempts = Vec::new();

    for psp in ordered {
        let name = psp.identity().name.clone();
        if !circuits.allows_call(&name).await? {
            attempts.push(RoutingAttempt { psp_name: name, skipped_circuit_open: true, outcome: None });
            continue;
        }

        let outcome = match authorize_with_retry(psp.as_ref(), amount, card_token, retry_policy, deadline).await {
            Ok(outcome) => outcome,
            Err(e) => {
                attempts.push(RoutingAttempt { psp_name: name, skipped_circuit_open: false, outcome: None });
                return Err(e);
            }
        };
        match &outcome {
            PspOutcome::Approved { .. } => {
                circuits.record_success(&name).await?;
                attempts.push(RoutingAttempt {
                    psp_name: name.clone(),
                    skipped_circuit_open: false,
                    outcome: Some(outcome.clone()),
                });
                return Ok(RoutingResult { outcome, psp_name: name, attempts });
            }
            PspOutcome::HardDeclined { .. } => {
                circuits.record_success(&name).await?;
                attempts.push(RoutingAttempt {
                    psp_name: name.clone(),
                    skipped_circuit_open: false,
                    outcome: Some(outcome.clone()),
                });
                return Ok(RoutingResult { outcome, psp_name: name, attempts });
            }
            PspOutcome::Transient(_) => {
                circuits.record_failure(&name).await?;
                attempts.push(RoutingAttempt {
                    psp_name: name,
                    skipped_circuit_open: false,
                    outcome: Some(outcome),
                });
            }
        }
    }

    Ok(RoutingResult {
        outcome: PspOutcome::HardDeclined {
            psp_reference: String::new(),
            reason: DeclineReason::PspExhausted,
        },
        psp_name: String::new(),
        attempts,
    })
}

// Routing depends on a Postgres-backed `CircuitRegistry`, so its
// coverage (short-circuit on approval, transient failover, hard-decline
// stop, open-circuit skip, retry-before-failover, exhaustion) lives in
// tests/psp_routing_flow.rs against a real database rather than faking
// `sqlx::PgPool` here.
