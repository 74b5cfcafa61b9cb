mod common;

use acquiring_gateway::collaborators::psp::ScriptedResponse;
use acquiring_gateway::domain::id::{ExternalId, PaymentId};
use acquiring_gateway::domain::money::{Currency, Money, MoneyAmount};
use acquiring_gateway::domain::payment::{DeclineReason, PaymentStatus};
use acquiring_gateway::domain::refund::RefundStatus;
use acquiring_gateway::infra::postgres::payment_repo;
use acquiring_gateway::services::orchestrator::AuthorizeRequest;
use acquiring_gateway::services::refund_engine::RefundRequest;
use common::{make_orchestrator, make_refund_engine, merchant, setup_pool, test_card};

async fn authorize_and_capture(
    orchestrator: &acquiring_gateway::services::orchestrator::Orchestrator,
    external_id: &str,
    cents: i64,
) -> PaymentId {
    let authorized = orchestrator
        .authorize(AuthorizeRequest {
            merchant_id: merchant("merchant_1"),
            external_id: ExternalId::new(external_id).unwrap(),
            money: Money::new(MoneyAmount::new(cents).unwrap(), Currency::Usd),
            card: test_card(),
            idempotency_key: None,
        })
        .await
        .unwrap();
    let payment_id: uuid::Uuid = authorized.payment_id.parse().unwrap();
    orchestrator.capture(payment_id.into()).await.unwrap();
    payment_id.into()
}

#[tokio::test]
async fn full_refund_cascades_the_payment_to_refunded() {
    let pool = setup_pool("acquiring_gateway_test_refund_full").await;
    let (orchestrator, bus) = make_orchestrator(pool.clone(), vec![ScriptedResponse::Approve]);
    let payment_id = authorize_and_capture(&orchestrator, "ext_refund_full", 4_000).await;

    let refund_engine = make_refund_engine(pool.clone(), bus, vec![ScriptedResponse::Approve]);
    let refund = refund_engine
        .refund(RefundRequest {
            payment_id,
            external_id: ExternalId::new("re_full_1").unwrap(),
            amount: MoneyAmount::new(4_000).unwrap(),
            reason: "requested_by_customer".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(refund.status, RefundStatus::Completed);

    let payment = payment_repo::find_by_id(&pool, payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn partial_refund_leaves_the_payment_captured() {
    let pool = setup_pool("acquiring_gateway_test_refund_partial").await;
    let (orchestrator, bus) = make_orchestrator(pool.clone(), vec![ScriptedResponse::Approve]);
    let payment_id = authorize_and_capture(&orchestrator, "ext_refund_partial", 10_000).await;

    let refund_engine = make_refund_engine(pool.clone(), bus, vec![ScriptedResponse::Approve]);
    refund_engine
        .refund(RefundRequest {
            payment_id,
            external_id: ExternalId::new("re_partial_1").unwrap(),
            amount: MoneyAmount::new(3_000).unwrap(),
            reason: "requested_by_customer".to_string(),
        })
        .await
        .unwrap();

    let payment = payment_repo::find_by_id(&pool, payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
}

#[tokio::test]
async fn refund_exceeding_the_outstanding_balance_is_rejected() {
    let pool = setup_pool("acquiring_gateway_test_refund_over").await;
    let (orchestrator, bus) = make_orchestrator(pool.clone(), vec![ScriptedResponse::Approve]);
    let payment_id = authorize_and_capture(&orchestrator, "ext_refund_over", 5_000).await;

    let refund_engine = make_refund_engine(pool.clone(), bus, vec![ScriptedResponse::Approve]);
    let result = refund_engine
        .refund(RefundRequest {
            payment_id,
            external_id: ExternalId::new("re_over_1").unwrap(),
            amount: MoneyAmount::new(5_001).unwrap(),
            reason: "requested_by_customer".to_string(),
        })
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn refund_against_an_unauthorized_payment_is_a_business_decline() {
    let pool = setup_pool("acquiring_gateway_test_refund_unauthorized").await;
    let (orchestrator, bus) =
        make_orchestrator(pool.clone(), vec![ScriptedResponse::HardDecline(DeclineReason::PspHardDecline)]);

    let declined = orchestrator
        .authorize(AuthorizeRequest {
            merchant_id: merchant("merchant_1"),
            external_id: ExternalId::new("ext_refund_declined").unwrap(),
            money: Money::new(MoneyAmount::new(2_000).unwrap(), Currency::Usd),
            card: test_card(),
            idempotency_key: None,
        })
        .await
        .unwrap();
    let payment_id: PaymentId = declined.payment_id.parse::<uuid::Uuid>().unwrap().into();

    let refund_engine = make_refund_engine(pool, bus, vec![]);
    let result = refund_engine
        .refund(RefundRequest {
            payment_id,
            external_id: ExternalId::new("re_declined_1").unwrap(),
            amount: MoneyAmount::new(2_000).unwrap(),
            reason: "requested_by_customer".to_string(),
        })
        .await;

    assert!(matches!(
        result,
        Err(acquiring_gateway::domain::error::GatewayError::BusinessDecline { .. })
    ));
}
