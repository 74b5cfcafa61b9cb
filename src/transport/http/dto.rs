//! Wire request/response shapes for the merchant-facing API (spec §6).
//! Kept separate from the domain types so the wire format can evolve
//! independently of `domain::payment::Payment`.

use serde::{Deserialize, Serialize};

use crate::domain::card::RawCard;
use crate::domain::money::{Currency, Money, MoneyAmount};
use crate::domain::payment::Payment;

#[derive(Debug, Deserialize)]
pub struct CardInput {
    pub pan: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub cvv: String,
}

impl From<CardInput> for RawCard {
    fn from(c: CardInput) -> Self {
        RawCard { pan: c.pan, expiry_month: c.expiry_month, expiry_year: c.expiry_year, cvv: c.cvv }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequestBody {
    pub external_id: String,
    pub amount: i64,
    pub currency: String,
    pub card: CardInput,
}

impl AuthorizeRequestBody {
    pub fn money(&self) -> Result<Money, crate::domain::error::GatewayError> {
        Ok(Money::new(MoneyAmount::new(self.amount)?, Currency::try_from(self.currency.as_str())?))
    }
}

#[derive(Debug, Deserialize)]
pub struct RefundRequestBody {
    pub payment_id: String,
    pub external_id: String,
    pub amount: i64,
    pub reason: String,
}

/// Full client-safe view of a payment (spec §3, §6), used by `GET
/// /payments/{id}` and `GET /transactions`. Always masks the card and
/// never carries CVV (spec §8 property 13).
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub payment_id: String,
    pub external_id: String,
    pub merchant_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub masked_card: String,
    pub card_brand: String,
    pub decline_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub authorized_at: Option<chrono::DateTime<chrono::Utc>>,
    pub captured_at: Option<chrono::DateTime<chrono::Utc>>,
    pub settled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Payment> for PaymentView {
    fn from(p: &Payment) -> Self {
        Self {
            payment_id: p.id.as_uuid().to_string(),
            external_id: p.external_id.as_str().to_string(),
            merchant_id: p.merchant_id.as_str().to_string(),
            amount: p.money.amount().cents(),
            currency: p.money.currency().as_str().to_string(),
            status: p.status.as_str().to_string(),
            masked_card: p.masked_card(),
            card_brand: p.card_brand.as_str().to_string(),
            decline_reason: p.decline_reason.as_ref().map(|r| r.as_str().to_string()),
            created_at: p.created_at,
            authorized_at: p.authorized_at,
            captured_at: p.captured_at,
            settled_at: p.settled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefundView {
    pub refund_id: String,
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl From<&crate::domain::refund::Refund> for RefundView {
    fn from(r: &crate::domain::refund::Refund) -> Self {
        Self {
            refund_id: r.id.to_string(),
            payment_id: r.payment_id.as_uuid().to_string(),
            amount: r.amount.amount().cents(),
            currency: r.amount.currency().as_str().to_string(),
            status: r.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub status: Option<String>,
    pub before_created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub before_id: Option<uuid::Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<PaymentView>,
    pub next_before_created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub next_before_id: Option<uuid::Uuid>,
}
