mod common;

use acquiring_gateway::collaborators::psp::ScriptedResponse;
use acquiring_gateway::domain::id::ExternalId;
use acquiring_gateway::domain::money::{Currency, Money, MoneyAmount};
use acquiring_gateway::domain::payment::PaymentStatus;
use acquiring_gateway::domain::settlement::SettlementStatus;
use acquiring_gateway::infra::postgres::{payment_repo, settlement_repo};
use acquiring_gateway::services::orchestrator::{AuthorizeRequest, Orchestrator};
use common::{make_orchestrator, make_settlement_engine, merchant, setup_pool, test_card};
use std::sync::Arc;

async fn authorize_and_capture(orchestrator: &Arc<Orchestrator>, external_id: &str, cents: i64) -> uuid::Uuid {
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
    payment_id
}

#[tokio::test]
async fn batch_settles_when_acquirer_report_matches_the_submitted_total() {
    let pool = setup_pool("acquiring_gateway_test_settlement_match").await;
    let (orchestrator, bus) =
        make_orchestrator(pool.clone(), vec![ScriptedResponse::Approve, ScriptedResponse::Approve]);

    let payment_a = authorize_and_capture(&orchestrator, "ext_settle_a", 5_000).await;
    let payment_b = authorize_and_capture(&orchestrator, "ext_settle_b", 7_500).await;

    let (engine, _acquirer) = make_settlement_engine(pool.clone(), bus);
    let today = chrono::Utc::now().date_naive();
    let batch_id = engine
        .create_and_submit_batch(&merchant("merchant_1"), &Currency::Usd, today)
        .await
        .unwrap()
        .expect("two captured payments should produce a batch");

    let batch = settlement_repo::find_pending(&pool, 100)
        .await
        .unwrap()
        .into_iter()
        .find(|b| b.id == batch_id)
        .unwrap();
    assert_eq!(batch.total_amount.cents(), 12_500);
    assert_eq!(batch.transaction_count, 2);
    let acquirer_reference = batch.acquirer_reference.clone().unwrap();

    let status = engine.reconcile(batch_id, &acquirer_reference).await.unwrap();
    assert_eq!(status, SettlementStatus::Settled);

    let settled_a = payment_repo::find_by_id(&pool, payment_a.into()).await.unwrap().unwrap();
    let settled_b = payment_repo::find_by_id(&pool, payment_b.into()).await.unwrap().unwrap();
    assert_eq!(settled_a.status, PaymentStatus::Settled);
    assert_eq!(settled_b.status, PaymentStatus::Settled);
}

#[tokio::test]
async fn batch_with_no_captured_payments_is_skipped() {
    let pool = setup_pool("acquiring_gateway_test_settlement_empty").await;
    let (_orchestrator, bus) = make_orchestrator(pool.clone(), vec![]);
    let (engine, _acquirer) = make_settlement_engine(pool, bus);

    let today = chrono::Utc::now().date_naive();
    let result = engine
        .create_and_submit_batch(&merchant("merchant_empty"), &Currency::Usd, today)
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn reconciliation_mismatch_raises_an_alert_and_does_not_cascade_to_settled() {
    let pool = setup_pool("acquiring_gateway_test_settlement_mismatch").await;
    let (orchestrator, bus) = make_orchestrator(pool.clone(), vec![ScriptedResponse::Approve]);

    let payment_id = authorize_and_capture(&orchestrator, "ext_mismatch_a", 10_000).await;

    let (engine, acquirer) = make_settlement_engine(pool.clone(), bus);
    let today = chrono::Utc::now().date_naive();
    let batch_id = engine
        .create_and_submit_batch(&merchant("merchant_1"), &Currency::Usd, today)
        .await
        .unwrap()
        .unwrap();

    let batch = settlement_repo::find_pending(&pool, 100)
        .await
        .unwrap()
        .into_iter()
        .find(|b| b.id == batch_id)
        .unwrap();
    let acquirer_reference = batch.acquirer_reference.clone().unwrap();
    acquirer.script_mismatch(&acquirer_reference, MoneyAmount::new(1).unwrap());

    let status = engine.reconcile(batch_id, &acquirer_reference).await.unwrap();
    assert_eq!(status, SettlementStatus::ReconciliationAlert);

    let payment = payment_repo::find_by_id(&pool, payment_id.into()).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
}
