use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::error::GatewayError;
use crate::domain::money::Money;

/// Minimal transaction context the fraud collaborator scores against
/// (spec §4.1 step 4, §6). Real implementations would see device
/// fingerprints, velocity counters, etc. — those signals are explicitly
/// out of scope (spec §1 Non-goals); this carries only what the
/// orchestrator already has in hand.
#[derive(Debug, Clone)]
pub struct FraudContext {
    pub merchant_id: String,
    pub card_token: String,
    pub amount: Money,
    pub card_bin: String,
}

/// Outcome of a fraud evaluation (spec §4.1 step 4). `require_3ds` can be
/// set independently of `decision` — a transaction can be allowed to
/// proceed to authorization but still be pushed through 3-D Secure first.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudResult {
    pub score: f64,
    pub decision: FraudDecision,
    pub require_3ds: bool,
    pub triggered_rules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudDecision {
    Allow,
    Review,
    Block,
}

/// `Evaluate(tx_context) -> FraudResult` within a bounded deadline (spec
/// §4.1 step 4, §6). On timeout or collaborator failure the caller must
/// fail closed to degraded rule-based scoring rather than silently
/// skipping the check (spec §9 Open Question resolution — see
/// DESIGN.md).
#[async_trait]
pub trait FraudService: Send + Sync {
    async fn evaluate(&self, ctx: &FraudContext) -> Result<FraudResult, GatewayError>;
}

/// Score thresholds (spec §6 defaults: review 0.50, block 0.75).
#[derive(Debug, Clone, Copy)]
pub struct FraudThresholds {
    pub review: f64,
    pub block: f64,
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self { review: 0.50, block: 0.75 }
    }
}

/// Reference rule-based scorer: a BIN blocklist plus a large-amount
/// heuristic. This is also the degraded-mode implementation the
/// orchestrator falls back to when the primary fraud collaborator is
/// unavailable (spec §9 Open Question — fail closed, never bypass).
pub struct RuleBasedFraud {
    thresholds: FraudThresholds,
    blocked_bins: HashSet<String>,
    large_amount_cents: i64,
}

impl RuleBasedFraud {
    pub fn new(thresholds: FraudThresholds, blocked_bins: HashSet<String>, large_amount_cents: i64) -> Self {
        Self { thresholds, blocked_bins, large_amount_cents }
    }
}

impl Default for RuleBasedFraud {
    fn default() -> Self {
        Self::new(FraudThresholds::default(), HashSet::new(), 500_000)
    }
}

#[async_trait]
impl FraudService for RuleBasedFraud {
    async fn evaluate(&self, ctx: &FraudContext) -> Result<FraudResult, GatewayError> {
        let mut score: f64 = 0.0;
        let mut rules = Vec::new();

        if self.blocked_bins.contains(&ctx.card_bin) {
            score = 1.0;
            rules.push("blocked_bin".to_string());
        } else if ctx.amount.amount().cents() >= self.large_amount_cents {
            score = (score + 0.60_f64).min(1.0);
            rules.push("large_amount".to_string());
        }

        let decision = if score >= self.thresholds.block {
            FraudDecision::Block
        } else if score >= self.thresholds.review {
            FraudDecision::Review
        } else {
            FraudDecision::Allow
        };

        Ok(FraudResult {
            score,
            decision,
            require_3ds: decision != FraudDecision::Allow,
            triggered_rules: rules,
        })
    }
}
