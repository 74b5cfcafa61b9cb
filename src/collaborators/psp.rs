use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::GatewayError;
use crate::domain::money::Money;
use crate::domain::payment::DeclineReason;

/// A single PSP's response to an authorize/capture/void/refund call
/// (spec §4.1 step 6, §4.4). The three-way split mirrors the spec's
/// decline-kind classification: a hard decline must not be retried
/// against the same PSP, a transient failure should trigger failover or
/// retry, and a contract violation (malformed response, unexpected
/// status) is an integrity concern, not a business outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PspOutcome {
    Approved { psp_reference: String },
    HardDeclined { psp_reference: String, reason: DeclineReason },
    Transient(String),
}

/// One configured acquiring connection (spec §3 `PspConnector`, §6).
#[derive(Debug, Clone)]
pub struct PspIdentity {
    pub name: String,
    pub priority: u32,
}

/// Authorize/Capture/Void/Refund against a single downstream processor
/// (spec §6). Wire formats and connection details are explicitly out of
/// scope (spec §1 Non-goals) — this boundary only carries the outcome
/// the rest of the system needs to make decisions on.
#[async_trait]
pub trait PspClient: Send + Sync {
    fn identity(&self) -> &PspIdentity;
    async fn authorize(&self, amount: &Money, card_token: &str) -> Result<PspOutcome, GatewayError>;
    async fn capture(&self, psp_reference: &str, amount: &Money) -> Result<PspOutcome, GatewayError>;
    async fn void(&self, psp_reference: &str) -> Result<PspOutcome, GatewayError>;
    async fn refund(&self, psp_reference: &str, amount: &Money) -> Result<PspOutcome, GatewayError>;
}

/// Scripted behavior for a [`MockPsp`]: lets tests exercise hard
/// declines, transient failures, and failover without a real connector.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Approve,
    HardDecline(DeclineReason),
    Transient,
}

/// Reference/test implementation whose per-call outcome is scripted up
/// front (spec §8 seeded scenario C: PSP failover).
pub struct MockPsp {
    identity: PspIdentity,
    script: Mutex<Vec<ScriptedResponse>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MockPsp {
    pub fn new(name: &str, priority: u32, script: Vec<ScriptedResponse>) -> Self {
        Self {
            identity: PspIdentity { name: name.to_string(), priority },
            script: Mutex::new(script),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn next_response(&self, op: &str) -> ScriptedResponse {
        let mut calls = self.calls.lock().unwrap();
        *calls.entry(op.to_string()).or_insert(0) += 1;
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            ScriptedResponse::Approve
        } else {
            script.remove(0)
        }
    }
}

#[async_trait]
impl PspClient for MockPsp {
    fn identity(&self) -> &PspIdentity {
        &self.identity
    }

    async fn authorize(&self, _amount: &Money, _card_token: &str) -> Result<PspOutcome, GatewayError> {
        match self.next_response("authorize") {
            ScriptedResponse::Approve => Ok(PspOutcome::Approved {
                psp_reference: format!("psp_ref_{}", uuid::Uuid::now_v7().simple()),
            }),
            ScriptedResponse::HardDecline(reason) => Ok(PspOutcome::HardDeclined {
                psp_reference: format!("psp_ref_{}", uuid::Uuid::now_v7().simple()),
                reason,
            }),
            ScriptedResponse::Transient => Ok(PspOutcome::Transient("connector timeout".into())),
        }
    }

    async fn capture(&self, psp_reference: &str, _amount: &Money) -> Result<PspOutcome, GatewayError> {
        match self.next_response("capture") {
            ScriptedResponse::Approve => Ok(PspOutcome::Approved {
                psp_reference: psp_reference.to_string(),
            }),
            ScriptedResponse::HardDecline(reason) => Ok(PspOutcome::HardDeclined {
                psp_reference: psp_reference.to_string(),
                reason,
            }),
            ScriptedResponse::Transient => Ok(PspOutcome::Transient("connector timeout".into())),
        }
    }

    async fn void(&self, psp_reference: &str) -> Result<PspOutcome, GatewayError> {
        match self.next_response("void") {
            ScriptedResponse::Transient => Ok(PspOutcome::Transient("connector timeout".into())),
            _ => Ok(PspOutcome::Approved {
                psp_reference: psp_reference.to_string(),
            }),
        }
    }

    async fn refund(&self, psp_reference: &str, _amount: &Money) -> Result<PspOutcome, GatewayError> {
        match self.next_response("refund") {
            ScriptedResponse::Transient => Ok(PspOutcome::Transient("connector timeout".into())),
            _ => Ok(PspOutcome::Approved {
                psp_reference: psp_reference.to_string(),
            }),
        }
    }
}
