use async_trait::async_trait;

use crate::domain::error::GatewayError;

/// Result of a completed 3-D Secure challenge (spec §4.1 step 5, §6).
/// Wire-level message formats (the ACS/DS protocol itself) are out of
/// scope (spec §1 Non-goals) — only the outcome the orchestrator needs
/// to decide whether to proceed to authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeDsOutcome {
    pub authenticated: bool,
    pub cavv: Option<String>,
    pub eci: Option<String>,
    pub xid: Option<String>,
}

/// `Initiate(payment_id, card_token) -> challenge_ref` /
/// `Complete(challenge_ref) -> ThreeDsOutcome` (spec §4.1 step 5).
#[async_trait]
pub trait ThreeDsService: Send + Sync {
    async fn initiate(&self, card_token: &str) -> Result<String, GatewayError>;
    async fn complete(&self, challenge_ref: &str) -> Result<ThreeDsOutcome, GatewayError>;
}

/// Reference implementation that always authenticates successfully.
/// Scripting a failure is a matter of swapping in a different token in
/// tests (`FAIL_` prefix), mirroring the PSP mock's scripted-outcome
/// style without needing a second collaborator type.
pub struct AlwaysAuthenticate;

#[async_trait]
impl ThreeDsService for AlwaysAuthenticate {
    async fn initiate(&self, card_token: &str) -> Result<String, GatewayError> {
        Ok(format!("challenge_{}", uuid_for(card_token)))
    }

    async fn complete(&self, challenge_ref: &str) -> Result<ThreeDsOutcome, GatewayError> {
        if challenge_ref.contains("FAIL_") {
            return Ok(ThreeDsOutcome {
                authenticated: false,
                cavv: None,
                eci: None,
                xid: None,
            });
        }
        Ok(ThreeDsOutcome {
            authenticated: true,
            cavv: Some("AAABBBCCCDDDEEEFFF000111222333".to_string()),
            eci: Some("05".to_string()),
            xid: Some(challenge_ref.to_string()),
        })
    }
}

fn uuid_for(seed: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    seed.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_challenge_carries_cavv() {
        let svc = AlwaysAuthenticate;
        let challenge = svc.initiate("tok_1").await.unwrap();
        let outcome = svc.complete(&challenge).await.unwrap();
        assert!(outcome.authenticated);
        assert!(outcome.cavv.is_some());
    }

    #[tokio::test]
    async fn scripted_failure_via_marker() {
        let svc = AlwaysAuthenticate;
        let outcome = svc.complete("challenge_FAIL_1").await.unwrap();
        assert!(!outcome.authenticated);
        assert!(outcome.cavv.is_none());
    }
}
