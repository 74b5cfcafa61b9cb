use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

use super::handlers;

/// The route table from spec §6 (abridged API table), unabridged.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/payments", post(handlers::authorize))
        .route("/payments/{id}", get(handlers::get_payment))
        .route("/payments/{id}/capture", post(handlers::capture))
        .route("/payments/{id}/void", post(handlers::void))
        .route("/refunds", post(handlers::refund))
        .route("/transactions", get(handlers::transactions))
        .with_state(state)
}
