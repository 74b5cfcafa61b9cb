//! Outbound HTTP delivery for the webhook dispatcher (spec §4.10, §6).
//! The merchant's actual endpoint, TLS, and HTTP stack are external
//! collaborators (spec §1 Non-goals "REST controllers") — this is the
//! minimal contract: deliver signed bytes, report back the status code
//! so the dispatcher can decide retry vs. success.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::GatewayError;

#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub endpoint: String,
    pub payload: Vec<u8>,
    pub signature_header: String,
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Returns the endpoint's HTTP status code. A transport error (DNS,
    /// connect, TLS) should surface as `GatewayError::Transient` so the
    /// dispatcher retries the same as it would a non-2xx response.
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<u16, GatewayError>;
}

/// In-process reference transport: records every delivery and answers
/// with a scripted status per endpoint (default 200), so tests can
/// exercise the retry-on-non-2xx path without a real HTTP server.
#[derive(Default)]
pub struct MockWebhookTransport {
    deliveries: Mutex<Vec<WebhookDelivery>>,
    scripted_status: Mutex<HashMap<String, u16>>,
}

impl MockWebhookTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_status(&self, endpoint: &str, status: u16) {
        self.scripted_status.lock().unwrap().insert(endpoint.to_string(), status);
    }

    pub fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for MockWebhookTransport {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<u16, GatewayError> {
        let status = self.scripted_status.lock().unwrap().get(&delivery.endpoint).copied().unwrap_or(200);
        self.deliveries.lock().unwrap().push(delivery);
        Ok(status)
    }
}
