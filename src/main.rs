use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use acquiring_gateway::AppState;
use acquiring_gateway::collaborators::acquirer::MockAcquirer;
use acquiring_gateway::collaborators::bus::InMemoryEventTransport;
use acquiring_gateway::collaborators::fraud::RuleBasedFraud;
use acquiring_gateway::collaborators::psp::{MockPsp, PspClient};
use acquiring_gateway::collaborators::three_ds::AlwaysAuthenticate;
use acquiring_gateway::collaborators::tokenization::InMemoryTokenizer;
use acquiring_gateway::collaborators::webhook_transport::MockWebhookTransport;
use acquiring_gateway::config::Settings;
use acquiring_gateway::domain::id::MerchantId;
use acquiring_gateway::domain::money::Currency;
use acquiring_gateway::engine::circuit_breaker::CircuitRegistry;
use acquiring_gateway::engine::event_bus::EventBus;
use acquiring_gateway::infra::postgres::idempotency_repo::PostgresIdempotencyRepo;
use acquiring_gateway::infra::postgres::{job_repo, settlement_repo};
use acquiring_gateway::services::orchestrator::Orchestrator;
use acquiring_gateway::services::refund_engine::RefundEngine;
use acquiring_gateway::services::settlement_engine::SettlementEngine;
use acquiring_gateway::services::webhook_dispatcher::WebhookDispatcher;
use acquiring_gateway::transport::http::routes::router;
use axum::Router;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::load()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&settings.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let tokenizer = Arc::new(InMemoryTokenizer::new());
    let fraud = Arc::new(RuleBasedFraud::new(
        settings.fraud_thresholds,
        settings.fraud_blocked_bins.clone(),
        settings.fraud_large_amount_cents,
    ));
    let three_ds = Arc::new(AlwaysAuthenticate);
    let psps: Vec<Arc<dyn PspClient>> = settings
        .psps
        .iter()
        .map(|p| Arc::new(MockPsp::new(&p.name, p.priority, Vec::new())) as Arc<dyn PspClient>)
        .collect();
    let circuits = Arc::new(CircuitRegistry::new(pool.clone(), settings.circuit_config));

    let idempotency = Arc::new(PostgresIdempotencyRepo::new(pool.clone()));
    let acquirer = Arc::new(MockAcquirer::new());
    let webhook_transport = Arc::new(MockWebhookTransport::new());

    // Built before the bus so every publish can also enqueue a webhook
    // delivery (spec §4.10 "for each published payment event").
    let webhook_dispatcher = Arc::new(WebhookDispatcher::new(
        pool.clone(),
        webhook_transport,
        settings.webhooks.clone(),
        settings.webhook_retry_policy,
    ));

    let event_transport = Arc::new(InMemoryEventTransport::new());
    let event_bus = Arc::new(
        EventBus::new(event_transport, settings.retry_policy).with_webhook_sink(webhook_dispatcher.clone()),
    );

    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        idempotency,
        tokenizer,
        fraud.clone(),
        fraud,
        three_ds,
        psps.clone(),
        circuits,
        event_bus.clone(),
        settings.psp_retry_policy,
        settings.deadlines,
    ));
    let refund_engine = Arc::new(RefundEngine::new(pool.clone(), psps, event_bus.clone()));
    let settlement_engine = Arc::new(SettlementEngine::new(pool.clone(), acquirer, event_bus.clone()));

    let state = Arc::new(AppState {
        pool: pool.clone(),
        orchestrator,
        refund_engine,
        settlement_engine: settlement_engine.clone(),
        webhook_dispatcher: webhook_dispatcher.clone(),
        api_keys: settings.api_keys.clone(),
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let merchants: HashSet<MerchantId> = settings.api_keys.values().cloned().collect();

    spawn_event_replay_worker(event_bus, shutdown_rx.clone());
    spawn_webhook_dispatch_worker(webhook_dispatcher, shutdown_rx.clone());
    spawn_stale_job_reaper(pool.clone(), shutdown_rx.clone());
    spawn_settlement_scheduler(settlement_engine, pool.clone(), merchants, shutdown_rx);

    let app: Router = router(state).layer(
        tower::ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(30)))
            .layer(tower_http::cors::CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}

/// Flushes any events the bus failed to publish on the first attempt
/// back onto the transport (spec §4.6 "retry-then-buffer-then-replay").
fn spawn_event_replay_worker(event_bus: Arc<EventBus>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match event_bus.replay_buffered().await {
                        Ok(n) if n > 0 => tracing::info!(flushed = n, "replayed buffered events"),
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "event replay failed"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    });
}

/// Drains the `webhook_delivery` job queue (spec §4.10).
fn spawn_webhook_dispatch_worker(
    dispatcher: Arc<WebhookDispatcher>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match dispatcher.dispatch_pending(50).await {
                        Ok(summary) if summary.delivered + summary.retried + summary.dead_lettered > 0 => {
                            tracing::info!(
                                delivered = summary.delivered,
                                retried = summary.retried,
                                dead_lettered = summary.dead_lettered,
                                "dispatched webhook batch"
                            );
                        }
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "webhook dispatch batch failed"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    });
}

/// Resets jobs abandoned by a crashed worker back to `pending` (spec
/// §4.5 background worker lifecycle).
fn spawn_stale_job_reaper(pool: sqlx::PgPool, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match job_repo::reap_stale(&pool, chrono::Duration::minutes(5)).await {
                        Ok(n) if n > 0 => tracing::info!(reset = n, "reaped stale jobs"),
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "stale job reap failed"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    });
}

/// Aggregates and reconciles settlement batches on a fixed cadence
/// (spec §4.8). Runs as its own worker pool, independent of request
/// handling (spec §5 "Scheduling model"). Each tick both opens
/// yesterday's batch for every merchant and sweeps every batch still
/// awaiting an acquirer report, so steps 1-3 and 4-5 of the lifecycle
/// both make progress without a separate worker.
fn spawn_settlement_scheduler(
    engine: Arc<SettlementEngine>,
    pool: sqlx::PgPool,
    merchants: HashSet<MerchantId>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let settlement_date = chrono::Utc::now().date_naive() - chrono::Duration::days(1);
                    for merchant_id in &merchants {
                        if let Err(err) = engine
                            .create_and_submit_batch(merchant_id, &Currency::Usd, settlement_date)
                            .await
                        {
                            tracing::warn!(merchant = %merchant_id.as_str(), error = %err, "settlement batch submission failed");
                        }
                    }

                    match settlement_repo::find_pending(&pool, 500).await {
                        Ok(batches) => {
                            for batch in batches {
                                let Some(acquirer_reference) = batch.acquirer_reference.as_deref() else {
                                    continue;
                                };
                                if let Err(err) = engine.reconcile(batch.id, acquirer_reference).await {
                                    tracing::warn!(batch_id = %batch.id, error = %err, "settlement reconciliation failed");
                                }
                            }
                        }
                        Err(err) => tracing::warn!(error = %err, "fetching pending settlement batches failed"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    });
}
