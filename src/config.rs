//! Environment/config contract (spec §6): everything the process needs
//! to boot is loaded once at startup via `dotenvy` plus manual env
//! parsing, never read ad hoc from deep inside the call stack.

use std::collections::HashMap;
use std::time::Duration;

use crate::collaborators::fraud::FraudThresholds;

use crate::domain::circuit::CircuitConfig;
use crate::domain::id::MerchantId;
use crate::engine::retry::RetryPolicy;
use crate::services::webhook_dispatcher::MerchantWebhookConfig;

/// One configured acquiring connection (spec §6 "PSP roster, ordered by
/// priority"). Credentials are opaque here; wiring them into a real
/// connector is outside this crate's scope (spec §1 Non-goals).
#[derive(Debug, Clone)]
pub struct PspConfig {
    pub name: String,
    pub priority: u32,
}

/// Per-collaborator-call deadlines (spec §5): a call that doesn't finish
/// in time is treated as a transient failure, same as a connection
/// error. Tokenization isn't named explicitly in spec §5's three
/// buckets; it is bounded by `cache` since a token vault lookup has the
/// same latency profile as a cache read.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub psp: Duration,
    pub fraud_or_three_ds: Duration,
    pub cache: Duration,
}

/// Everything the process needs to boot, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub tls_min_version: String,
    pub psps: Vec<PspConfig>,
    pub api_keys: HashMap<String, MerchantId>,
    pub webhooks: HashMap<String, MerchantWebhookConfig>,
    pub idempotency_retention: Duration,
    pub fraud_thresholds: FraudThresholds,
    pub fraud_blocked_bins: std::collections::HashSet<String>,
    pub fraud_large_amount_cents: i64,
    pub circuit_config: CircuitConfig,
    pub retry_policy: RetryPolicy,
    pub webhook_retry_policy: RetryPolicy,
    pub psp_retry_policy: RetryPolicy,
    pub deadlines: Deadlines,
}

impl Settings {
    /// Loads `.env` (if present) then resolves every recognized option
    /// from the process environment, falling back to spec §6's defaults.
    pub fn load() -> Result<Self, crate::domain::error::GatewayError> {
        dotenvy::dotenv().ok();

        let database_url = env_var("DATABASE_URL")?;
        let bind_addr = env_var_or("BIND_ADDR", "0.0.0.0:3000");
        let tls_min_version = env_var_or("TLS_MIN_VERSION", "1.3");

        let psps = parse_psp_roster(&env_var_or("PSP_ROSTER", "primary:1,backup:2"))?;
        let api_keys = parse_key_value_map("API_KEYS")?
            .into_iter()
            .map(|(k, v)| Ok((k, MerchantId::new(v)?)))
            .collect::<Result<_, crate::domain::error::GatewayError>>()?;
        let webhooks = parse_webhook_map("WEBHOOKS")?;

        let idempotency_retention =
            Duration::from_secs(env_var_parsed_or("IDEMPOTENCY_RETENTION_SECS", 24 * 60 * 60)?);

        let fraud_thresholds = FraudThresholds {
            review: env_var_parsed_or("FRAUD_REVIEW_SCORE", 0.50)?,
            block: env_var_parsed_or("FRAUD_BLOCK_SCORE", 0.75)?,
        };
        let fraud_blocked_bins = parse_csv_set(&env_var_or("FRAUD_BLOCKED_BINS", ""));
        let fraud_large_amount_cents = env_var_parsed_or("FRAUD_LARGE_AMOUNT_CENTS", 1_000_000)?;

        let circuit_config = CircuitConfig {
            failure_threshold: env_var_parsed_or("CIRCUIT_FAILURE_THRESHOLD", 5)?,
            cooldown: chrono::Duration::seconds(env_var_parsed_or("CIRCUIT_COOLDOWN_SECS", 30)?),
            success_threshold: env_var_parsed_or("CIRCUIT_SUCCESS_THRESHOLD", 3)?,
        };

        let retry_policy = RetryPolicy {
            initial_delay: Duration::from_secs(env_var_parsed_or("RETRY_INITIAL_DELAY_SECS", 1)?),
            multiplier: env_var_parsed_or("RETRY_MULTIPLIER", 2.0)?,
            max_delay: Duration::from_secs(env_var_parsed_or("RETRY_MAX_DELAY_SECS", 60)?),
            max_attempts: env_var_parsed_or("RETRY_MAX_ATTEMPTS", 5)?,
        };
        let webhook_retry_policy = RetryPolicy {
            max_attempts: env_var_parsed_or("WEBHOOK_RETRY_MAX_ATTEMPTS", 10)?,
            ..retry_policy
        };
        // Tighter than the system-wide default: this retry happens inline
        // within the request's own PSP deadline budget, not in a
        // background worker that can afford minutes of backoff.
        let psp_retry_policy = RetryPolicy {
            initial_delay: Duration::from_millis(env_var_parsed_or("PSP_RETRY_INITIAL_DELAY_MS", 200)?),
            multiplier: env_var_parsed_or("PSP_RETRY_MULTIPLIER", 2.0)?,
            max_delay: Duration::from_millis(env_var_parsed_or("PSP_RETRY_MAX_DELAY_MS", 2_000)?),
            max_attempts: env_var_parsed_or("PSP_RETRY_MAX_ATTEMPTS", 3)?,
        };

        let deadlines = Deadlines {
            psp: Duration::from_secs(env_var_parsed_or("DEADLINE_PSP_SECS", 5)?),
            fraud_or_three_ds: Duration::from_secs(env_var_parsed_or("DEADLINE_FRAUD_THREE_DS_SECS", 2)?),
            cache: Duration::from_millis(env_var_parsed_or("DEADLINE_CACHE_MS", 500)?),
        };

        Ok(Self {
            database_url,
            bind_addr,
            tls_min_version,
            psps,
            api_keys,
            webhooks,
            idempotency_retention,
            fraud_thresholds,
            fraud_blocked_bins,
            fraud_large_amount_cents,
            circuit_config,
            retry_policy,
            webhook_retry_policy,
            psp_retry_policy,
            deadlines,
        })
    }
}

fn env_var(name: &str) -> Result<String, crate::domain::error::GatewayError> {
    std::env::var(name)
        .map_err(|_| crate::domain::error::GatewayError::Integrity(format!("missing required env var {name}")))
}

fn env_var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_var_parsed_or<T: std::str::FromStr>(
    name: &str,
    default: T,
) -> Result<T, crate::domain::error::GatewayError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| crate::domain::error::GatewayError::Integrity(format!("invalid value for {name}"))),
        Err(_) => Ok(default),
    }
}

/// `name:priority,name:priority,...` (spec §6 "PSP roster, ordered by
/// priority").
fn parse_psp_roster(raw: &str) -> Result<Vec<PspConfig>, crate::domain::error::GatewayError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let (name, priority) = entry
                .split_once(':')
                .ok_or_else(|| crate::domain::error::GatewayError::Integrity(format!("malformed PSP_ROSTER entry: {entry}")))?;
            let priority = priority
                .parse()
                .map_err(|_| crate::domain::error::GatewayError::Integrity(format!("malformed PSP_ROSTER priority: {entry}")))?;
            Ok(PspConfig { name: name.to_string(), priority })
        })
        .collect()
}

fn parse_csv_set(raw: &str) -> std::collections::HashSet<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// `key=value,key=value,...` read from a single env var (kept out of
/// `.env` key-sprawl for a table that can grow per merchant).
fn parse_key_value_map(var: &str) -> Result<HashMap<String, String>, crate::domain::error::GatewayError> {
    let raw = env_var_or(var, "");
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let (k, v) = entry
                .split_once('=')
                .ok_or_else(|| crate::domain::error::GatewayError::Integrity(format!("malformed {var} entry: {entry}")))?;
            Ok((k.to_string(), v.to_string()))
        })
        .collect()
}

/// `merchant=endpoint|secret,merchant=endpoint|secret,...`.
fn parse_webhook_map(
    var: &str,
) -> Result<HashMap<String, MerchantWebhookConfig>, crate::domain::error::GatewayError> {
    let raw = env_var_or(var, "");
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let (merchant, rest) = entry
                .split_once('=')
                .ok_or_else(|| crate::domain::error::GatewayError::Integrity(format!("malformed {var} entry: {entry}")))?;
            let (endpoint, secret) = rest
                .split_once('|')
                .ok_or_else(|| crate::domain::error::GatewayError::Integrity(format!("malformed {var} entry: {entry}")))?;
            Ok((
                merchant.to_string(),
                MerchantWebhookConfig { endpoint: endpoint.to_string(), secret: secret.to_string() },
            ))
        })
        .collect()
}
