pub mod collaborators;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infra;
pub mod services;
pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::id::MerchantId;
use crate::services::orchestrator::Orchestrator;
use crate::services::refund_engine::RefundEngine;
use crate::services::settlement_engine::SettlementEngine;
use crate::services::webhook_dispatcher::WebhookDispatcher;

/// Shared state handed to every Axum handler (spec §6 API surface).
/// One instance per process; all fields are internally synchronized or
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub orchestrator: Arc<Orchestrator>,
    pub refund_engine: Arc<RefundEngine>,
    pub settlement_engine: Arc<SettlementEngine>,
    pub webhook_dispatcher: Arc<WebhookDispatcher>,
    pub api_keys: HashMap<String, MerchantId>,
}
