mod common;

use std::sync::Arc;
use std::time::Duration;

use acquiring_gateway::collaborators::psp::{MockPsp, PspClient, PspOutcome, ScriptedResponse};
use acquiring_gateway::domain::circuit::CircuitConfig;
use acquiring_gateway::domain::money::{Currency, Money, MoneyAmount};
use acquiring_gateway::domain::payment::DeclineReason;
use acquiring_gateway::engine::circuit_breaker::CircuitRegistry;
use acquiring_gateway::engine::psp_router::route_authorize;
use acquiring_gateway::engine::retry::RetryPolicy;
use common::setup_pool;

fn money() -> Money {
    Money::new(MoneyAmount::new(1000).unwrap(), Currency::Usd)
}

fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        initial_delay: Duration::from_millis(1),
        multiplier: 1.0,
        max_delay: Duration::from_millis(5),
        max_attempts: 3,
    }
}

#[tokio::test]
async fn primary_approval_short_circuits() {
    let pool = setup_pool("acquiring_gateway_test_routing_short_circuit").await;
    let circuits = CircuitRegistry::new(pool, CircuitConfig::default());
    let primary: Arc<dyn PspClient> = Arc::new(MockPsp::new("primary", 1, vec![ScriptedResponse::Approve]));
    let secondary: Arc<dyn PspClient> = Arc::new(MockPsp::new("secondary", 2, vec![ScriptedResponse::Approve]));

    let result = route_authorize(
        &[primary, secondary],
        &circuits,
        &money(),
        "tok_1",
        &fast_retry_policy(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(result.psp_name, "primary");
    assert_eq!(result.attempts.len(), 1);
}

#[tokio::test]
async fn transient_primary_fails_over_to_secondary_once_retries_are_exhausted() {
    let pool = setup_pool("acquiring_gateway_test_routing_failover").await;
    let circuits = CircuitRegistry::new(pool, CircuitConfig::default());
    let primary: Arc<dyn PspClient> = Arc::new(MockPsp::new(
        "primary",
        1,
        vec![ScriptedResponse::Transient, ScriptedResponse::Transient, ScriptedResponse::Transient],
    ));
    let secondary: Arc<dyn PspClient> = Arc::new(MockPsp::new("secondary", 2, vec![ScriptedResponse::Approve]));

    let result = route_authorize(
        &[primary, secondary],
        &circuits,
        &money(),
        "tok_1",
        &fast_retry_policy(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(result.psp_name, "secondary");
    assert_eq!(result.attempts.len(), 2);
}

#[tokio::test]
async fn transient_primary_recovers_within_its_retry_budget_without_failover() {
    let pool = setup_pool("acquiring_gateway_test_routing_retry_recovers").await;
    let circuits = CircuitRegistry::new(pool, CircuitConfig::default());
    let primary: Arc<dyn PspClient> =
        Arc::new(MockPsp::new("primary", 1, vec![ScriptedResponse::Transient, ScriptedResponse::Approve]));
    let secondary: Arc<dyn PspClient> = Arc::new(MockPsp::new("secondary", 2, vec![ScriptedResponse::Approve]));

    let result = route_authorize(
        &[primary, secondary],
        &circuits,
        &money(),
        "tok_1",
        &fast_retry_policy(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    // The retry engine absorbed the single transient blip against the
    // primary, so routing never had to consult the secondary at all.
    assert_eq!(result.psp_name, "primary");
    assert_eq!(result.attempts.len(), 1);
    assert!(matches!(result.outcome, PspOutcome::Approved { .. }));
}

#[tokio::test]
async fn hard_decline_does_not_fail_over() {
    let pool = setup_pool("acquiring_gateway_test_routing_hard_decline").await;
    let circuits = CircuitRegistry::new(pool, CircuitConfig::default());
    let primary: Arc<dyn PspClient> = Arc::new(MockPsp::new(
        "primary",
        1,
        vec![ScriptedResponse::HardDecline(DeclineReason::PspHardDecline)],
    ));
    let secondary: Arc<dyn PspClient> = Arc::new(MockPsp::new("secondary", 2, vec![ScriptedResponse::Approve]));

    let result = route_authorize(
        &[primary, secondary],
        &circuits,
        &money(),
        "tok_1",
        &fast_retry_policy(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(matches!(result.outcome, PspOutcome::HardDeclined { .. }));
    assert_eq!(result.attempts.len(), 1);
}

#[tokio::test]
async fn open_circuit_is_skipped() {
    let pool = setup_pool("acquiring_gateway_test_routing_open_circuit").await;
    let circuits = CircuitRegistry::new(pool, CircuitConfig { failure_threshold: 1, ..CircuitConfig::default() });
    circuits.record_failure("primary").await.unwrap();

    let primary: Arc<dyn PspClient> = Arc::new(MockPsp::new("primary", 1, vec![]));
    let secondary: Arc<dyn PspClient> = Arc::new(MockPsp::new("secondary", 2, vec![ScriptedResponse::Approve]));

    let result = route_authorize(
        &[primary, secondary],
        &circuits,
        &money(),
        "tok_1",
        &fast_retry_policy(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(result.psp_name, "secondary");
    assert!(result.attempts[0].skipped_circuit_open);
}

#[tokio::test]
async fn all_transient_exhausts() {
    let pool = setup_pool("acquiring_gateway_test_routing_exhausts").await;
    let circuits = CircuitRegistry::new(pool, CircuitConfig::default());
    let primary: Arc<dyn PspClient> =
        Arc::new(MockPsp::new("primary", 1, vec![ScriptedResponse::Transient; 3]));
    let secondary: Arc<dyn PspClient> =
        Arc::new(MockPsp::new("secondary", 2, vec![ScriptedResponse::Transient; 3]));

    let result = route_authorize(
        &[primary, secondary],
        &circuits,
        &money(),
        "tok_1",
        &fast_retry_policy(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(matches!(
        result.outcome,
        PspOutcome::HardDeclined { reason: DeclineReason::PspExhausted, .. }
    ));
}
