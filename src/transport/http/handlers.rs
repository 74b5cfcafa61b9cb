//! Route handlers (spec §6). Each one authenticates, maps the wire
//! request onto a domain call, and maps the domain result back onto
//! the wire — no business logic lives here, same division of labor as
//! the teacher's `stripe_webhook_handler`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};

use crate::AppState;
use crate::domain::error::GatewayError;
use crate::domain::id::{ExternalId, IdempotencyKey, MerchantId, PaymentId};
use crate::domain::money::MoneyAmount;
use crate::domain::payment::PaymentStatus;
use crate::infra::postgres::payment_repo;
use crate::services::orchestrator::AuthorizeRequest;
use crate::services::refund_engine::RefundRequest;
use crate::transport::http::dto::{
    AuthorizeRequestBody, PaymentView, RefundRequestBody, RefundView, TransactionsQuery, TransactionsResponse,
};
use crate::transport::http::errors::ApiError;

/// Resolves the calling merchant from the `Authorization: Bearer
/// <api-key>` header against the configured key table (spec §6
/// "Authorization or API key"). Framework-level concerns like TLS
/// termination and rate limiting live outside this crate (spec §1
/// Non-goals).
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<MerchantId, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::Unauthorized("missing Authorization header".into()))?;
    let api_key = header.strip_prefix("Bearer ").unwrap_or(header);
    state.api_keys.get(api_key).cloned().ok_or_else(|| GatewayError::Unauthorized("unknown API key".into()).into())
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>, ApiError> {
    match headers.get("Idempotency-Key").and_then(|v| v.to_str().ok()) {
        Some(raw) => Ok(Some(IdempotencyKey::new(raw)?)),
        None => Ok(None),
    }
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, ApiError> {
    uuid::Uuid::parse_str(raw)
        .map(PaymentId::from)
        .map_err(|_| ApiError::from(GatewayError::Validation(format!("invalid payment id: {raw}"))))
}

pub async fn authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AuthorizeRequestBody>,
) -> Result<(StatusCode, Json<crate::services::orchestrator::AuthorizeResponse>), ApiError> {
    let merchant_id = authenticate(&state, &headers)?;
    let key = idempotency_key(&headers)?;

    let req = AuthorizeRequest {
        merchant_id,
        external_id: ExternalId::new(body.external_id.clone())?,
        money: body.money()?,
        card: body.card.into(),
        idempotency_key: key,
    };

    let response = state.orchestrator.authorize(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PaymentView>, ApiError> {
    let merchant_id = authenticate(&state, &headers)?;
    let payment_id = parse_payment_id(&id)?;

    let payment = payment_repo::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("payment {id} not found")))?;

    if payment.merchant_id != merchant_id {
        return Err(GatewayError::NotFound(format!("payment {id} not found")).into());
    }

    Ok(Json(PaymentView::from(&payment)))
}

pub async fn capture(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<crate::services::orchestrator::AuthorizeResponse>, ApiError> {
    authenticate(&state, &headers)?;
    let payment_id = parse_payment_id(&id)?;
    let response = state.orchestrator.capture(payment_id).await?;
    Ok(Json(response))
}

pub async fn void(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<crate::services::orchestrator::AuthorizeResponse>, ApiError> {
    authenticate(&state, &headers)?;
    let payment_id = parse_payment_id(&id)?;
    let response = state.orchestrator.void(payment_id).await?;
    Ok(Json(response))
}

pub async fn refund(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RefundRequestBody>,
) -> Result<Json<RefundView>, ApiError> {
    authenticate(&state, &headers)?;
    let payment_id = parse_payment_id(&body.payment_id)?;

    let req = RefundRequest {
        payment_id,
        external_id: ExternalId::new(body.external_id)?,
        amount: MoneyAmount::new(body.amount)?,
        reason: body.reason,
    };

    let refund = state.refund_engine.refund(req).await?;
    Ok(Json(RefundView::from(&refund)))
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let merchant_id = authenticate(&state, &headers)?;

    let status = query.status.as_deref().map(PaymentStatus::try_from).transpose()?;
    let before = match (query.before_created_at, query.before_id) {
        (Some(ts), Some(id)) => Some((ts, id)),
        _ => None,
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let payments = payment_repo::list_transactions(&state.pool, &merchant_id, status, before, limit).await?;

    let next = payments.last().map(|p| (p.created_at, p.id.as_uuid()));
    Ok(Json(TransactionsResponse {
        transactions: payments.iter().map(PaymentView::from).collect(),
        next_before_created_at: next.map(|(ts, _)| ts),
        next_before_id: next.map(|(_, id)| id),
    }))
}
