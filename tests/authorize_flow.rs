mod common;

use acquiring_gateway::collaborators::psp::ScriptedResponse;
use acquiring_gateway::domain::id::{ExternalId, IdempotencyKey};
use acquiring_gateway::domain::money::{Currency, Money, MoneyAmount};
use acquiring_gateway::domain::payment::DeclineReason;
use acquiring_gateway::services::orchestrator::AuthorizeRequest;
use common::{make_orchestrator, merchant, setup_pool, test_card};

fn money(cents: i64) -> Money {
    Money::new(MoneyAmount::new(cents).unwrap(), Currency::Usd)
}

fn req(external_id: &str, idem: Option<&str>) -> AuthorizeRequest {
    AuthorizeRequest {
        merchant_id: merchant("merchant_1"),
        external_id: ExternalId::new(external_id).unwrap(),
        money: money(5_000),
        card: test_card(),
        idempotency_key: idem.map(|k| IdempotencyKey::new(k).unwrap()),
    }
}

#[tokio::test]
async fn authorize_capture_and_void_happy_path() {
    let pool = setup_pool("acquiring_gateway_test_authorize_happy").await;
    let (orchestrator, _bus) = make_orchestrator(pool, vec![ScriptedResponse::Approve]);

    let authorized = orchestrator.authorize(req("ext_authorize_happy", None)).await.unwrap();
    assert_eq!(authorized.status, "authorized");
    assert!(authorized.decline_reason.is_none());
    assert!(authorized.masked_card.ends_with("4242"));

    let payment_id: uuid::Uuid = authorized.payment_id.parse().unwrap();
    let captured = orchestrator.capture(payment_id.into()).await.unwrap();
    assert_eq!(captured.status, "captured");
}

#[tokio::test]
async fn authorize_then_void_cancels_the_authorization() {
    let pool = setup_pool("acquiring_gateway_test_authorize_void").await;
    let (orchestrator, _bus) = make_orchestrator(pool, vec![ScriptedResponse::Approve]);

    let authorized = orchestrator.authorize(req("ext_authorize_void", None)).await.unwrap();
    let payment_id: uuid::Uuid = authorized.payment_id.parse().unwrap();

    let voided = orchestrator.void(payment_id.into()).await.unwrap();
    assert_eq!(voided.status, "cancelled");

    // Captured is only legal against an authorized payment, so a second
    // void/capture attempt on an already-cancelled one is a business
    // decline, not a retry of the same operation.
    let second_void = orchestrator.void(payment_id.into()).await;
    assert!(matches!(second_void, Err(acquiring_gateway::domain::error::GatewayError::BusinessDecline { .. })));
}

#[tokio::test]
async fn hard_decline_is_a_terminal_business_outcome() {
    let pool = setup_pool("acquiring_gateway_test_hard_decline").await;
    let (orchestrator, _bus) =
        make_orchestrator(pool, vec![ScriptedResponse::HardDecline(DeclineReason::PspHardDecline)]);

    let declined = orchestrator.authorize(req("ext_hard_decline", None)).await.unwrap();
    assert_eq!(declined.status, "declined");
    assert_eq!(declined.decline_reason.as_deref(), Some("PSP_HARD_DECLINE"));
}

#[tokio::test]
async fn idempotency_key_replays_the_cached_response_without_reauthorizing() {
    let pool = setup_pool("acquiring_gateway_test_idempotency").await;
    let (orchestrator, _bus) = make_orchestrator(pool, vec![ScriptedResponse::Approve, ScriptedResponse::Approve]);

    let first = orchestrator.authorize(req("ext_idempotent", Some("idem_key_1"))).await.unwrap();
    let second = orchestrator.authorize(req("ext_idempotent", Some("idem_key_1"))).await.unwrap();

    assert_eq!(first.payment_id, second.payment_id);
    assert_eq!(first.trace_id, second.trace_id);
}

#[tokio::test]
async fn idempotency_key_reused_with_a_different_body_is_a_conflict() {
    let pool = setup_pool("acquiring_gateway_test_idempotency_conflict").await;
    let (orchestrator, _bus) = make_orchestrator(pool, vec![ScriptedResponse::Approve, ScriptedResponse::Approve]);

    orchestrator.authorize(req("ext_conflict_a", Some("idem_key_2"))).await.unwrap();
    let conflict = orchestrator.authorize(req("ext_conflict_b", Some("idem_key_2"))).await;

    assert!(matches!(
        conflict,
        Err(acquiring_gateway::domain::error::GatewayError::IdempotencyConflict(_))
    ));
}

#[tokio::test]
async fn distinct_merchants_reusing_the_same_idempotency_key_do_not_collide() {
    let pool = setup_pool("acquiring_gateway_test_idempotency_cross_merchant").await;
    let (orchestrator, _bus) = make_orchestrator(pool, vec![ScriptedResponse::Approve, ScriptedResponse::Approve]);

    let merchant_1_req = AuthorizeRequest {
        merchant_id: merchant("merchant_1"),
        external_id: ExternalId::new("ext_cross_merchant_1").unwrap(),
        money: money(5_000),
        card: test_card(),
        idempotency_key: Some(IdempotencyKey::new("shared_key").unwrap()),
    };
    let merchant_2_req = AuthorizeRequest {
        merchant_id: merchant("merchant_2"),
        external_id: ExternalId::new("ext_cross_merchant_2").unwrap(),
        money: money(7_500),
        card: test_card(),
        idempotency_key: Some(IdempotencyKey::new("shared_key").unwrap()),
    };

    let first = orchestrator.authorize(merchant_1_req).await.unwrap();
    let second = orchestrator.authorize(merchant_2_req).await.unwrap();

    assert_ne!(first.payment_id, second.payment_id);
}

#[tokio::test]
async fn zero_amount_authorization_is_rejected_before_touching_any_collaborator() {
    let pool = setup_pool("acquiring_gateway_test_zero_amount").await;
    let (orchestrator, _bus) = make_orchestrator(pool, vec![]);

    let mut request = req("ext_zero_amount", None);
    request.money = money(0);
    let result = orchestrator.authorize(request).await;

    assert!(matches!(result, Err(acquiring_gateway::domain::error::GatewayError::Validation(_))));
}
