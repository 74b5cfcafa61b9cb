use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collaborators::bus::{EventTransport, RawMessage};
use crate::domain::error::GatewayError;
use crate::domain::event::Event;
use crate::engine::retry::{RetryDecision, RetryPolicy};

/// Bridges a published event onto the outbound webhook queue (spec
/// §4.10 "for each published payment event..."). Defined here rather
/// than depending on `services::webhook_dispatcher` directly, so the
/// engine layer never depends downward on the service layer — the
/// dispatcher implements this trait instead.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn enqueue(&self, event: &Event) -> Result<(), GatewayError>;
}

/// Schema-validated wrapper around the raw [`EventTransport`] (spec
/// §4.6): enforces the partition key matches the event's own
/// `partition_key`, retries a failed publish per the retry policy
/// before buffering it for later replay, and dedups consumption by
/// event id so an at-least-once transport never double-applies an
/// event to callers.
pub struct EventBus {
    transport: Arc<dyn EventTransport>,
    retry_policy: RetryPolicy,
    buffered: Mutex<Vec<Event>>,
    seen: Mutex<HashSet<uuid::Uuid>>,
    webhook_sink: Option<Arc<dyn WebhookSink>>,
}

impl EventBus {
    pub fn new(transport: Arc<dyn EventTransport>, retry_policy: RetryPolicy) -> Self {
        Self {
            transport,
            retry_policy,
            buffered: Mutex::new(Vec::new()),
            seen: Mutex::new(HashSet::new()),
            webhook_sink: None,
        }
    }

    /// Attaches the webhook dispatcher so every publish also enqueues a
    /// delivery. Takes `self` by value since this is only ever called
    /// once, right after construction, before the bus is wrapped in an
    /// `Arc` and shared.
    pub fn with_webhook_sink(mut self, sink: Arc<dyn WebhookSink>) -> Self {
        self.webhook_sink = Some(sink);
        self
    }

    /// Publishes `event`, retrying per the configured policy. If every
    /// attempt fails, the event is held in the in-memory buffer rather
    /// than dropped, so a later call to [`EventBus::replay_buffered`]
    /// can flush it once the transport recovers (spec §4.6
    /// "retry-then-buffer-then-replay"). Every publish also enqueues a
    /// webhook delivery (spec §4.10), independent of whether the bus
    /// transport itself is healthy right now.
    pub async fn publish(&self, event: Event) -> Result<(), GatewayError> {
        if let Some(sink) = &self.webhook_sink {
            sink.enqueue(&event).await?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let payload = serde_json::to_vec(&EventEnvelope::from(&event))?;
            let message = RawMessage { partition_key: event.partition_key.clone(), payload };

            match self.transport.publish(message).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => match self.retry_policy.decide(attempt) {
                    RetryDecision::RetryAfter(delay) => {
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::Exhausted => {
                        self.buffered.lock().unwrap().push(event);
                        return Ok(());
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Attempts to flush every buffered event, keeping whatever still
    /// fails to publish for the next call.
    pub async fn replay_buffered(&self) -> Result<usize, GatewayError> {
        let pending = std::mem::take(&mut *self.buffered.lock().unwrap());
        let mut flushed = 0;
        for event in pending {
            let payload = serde_json::to_vec(&EventEnvelope::from(&event))?;
            let message = RawMessage { partition_key: event.partition_key.clone(), payload };
            match self.transport.publish(message).await {
                Ok(()) => flushed += 1,
                Err(_) => self.buffered.lock().unwrap().push(event),
            }
        }
        Ok(flushed)
    }

    /// Polls the transport, decodes, and returns only events not seen
    /// before (spec §4.6 "idempotent consumption via dedup set").
    /// Acknowledges the raw messages regardless, since the dedup set is
    /// what makes redelivery safe, not leaving them unacked.
    pub async fn consume(&self, partition_key: &str, max: usize) -> Result<Vec<Event>, GatewayError> {
        let raw = self.transport.poll(partition_key, max).await?;
        let count = raw.len();
        let mut fresh = Vec::new();

        for message in &raw {
            let envelope: EventEnvelope = serde_json::from_slice(&message.payload)?;
            let is_new = self.seen.lock().unwrap().insert(envelope.event_id);
            if is_new {
                fresh.push(envelope.into_event()?);
            }
        }

        self.transport.ack(partition_key, count).await?;
        Ok(fresh)
    }

    pub fn buffered_count(&self) -> usize {
        self.buffered.lock().unwrap().len()
    }
}

/// Wire shape for an event on the bus (spec §4.6). Kept distinct from
/// `domain::event::Event` so the wire schema can evolve independently
/// of the in-process type.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct EventEnvelope {
    event_id: uuid::Uuid,
    event_type: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    correlation_id: String,
    trace_id: String,
    partition_key: String,
    payload: serde_json::Value,
}

impl From<&Event> for EventEnvelope {
    fn from(e: &Event) -> Self {
        Self {
            event_id: e.event_id,
            event_type: e.event_type.as_str().to_string(),
            timestamp: e.timestamp,
            correlation_id: e.correlation_id.clone(),
            trace_id: e.trace_id.clone(),
            partition_key: e.partition_key.clone(),
            payload: e.payload.clone(),
        }
    }
}

impl EventEnvelope {
    fn into_event(self) -> Result<Event, GatewayError> {
        Ok(Event {
            event_id: self.event_id,
            event_type: crate::domain::event::EventType::try_from(self.event_type.as_str())?,
            timestamp: self.timestamp,
            correlation_id: self.correlation_id,
            trace_id: self.trace_id,
            partition_key: self.partition_key,
            payload: self.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::bus::InMemoryEventTransport;
    use crate::domain::event::EventType;

    fn event(partition_key: &str) -> Event {
        Event::new(
            EventType::PaymentAuthorized,
            "corr_1".to_string(),
            "trace_1".to_string(),
            partition_key.to_string(),
            serde_json::json!({"payment_id": "abc"}),
        )
    }

    #[tokio::test]
    async fn publish_then_consume_roundtrips() {
        let transport = Arc::new(InMemoryEventTransport::new());
        let bus = EventBus::new(transport, RetryPolicy::default());
        bus.publish(event("payment_1")).await.unwrap();
        let consumed = bus.consume("payment_1", 10).await.unwrap();
        assert_eq!(consumed.len(), 1);
    }

    #[tokio::test]
    async fn redelivered_message_is_deduped() {
        let transport = Arc::new(InMemoryEventTransport::new());
        let bus = EventBus::new(transport.clone(), RetryPolicy::default());
        let ev = event("payment_1");
        let id = ev.event_id;

        // Simulate the transport redelivering the same message (e.g. an
        // ack that did not make it through) by publishing and polling
        // twice without the ack removing it from the queue in between.
        bus.publish(ev).await.unwrap();
        let first = bus.consume("payment_1", 10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].event_id, id);

        transport
            .publish(RawMessage {
                partition_key: "payment_1".to_string(),
                payload: serde_json::to_vec(&EventEnvelope::from(&first[0])).unwrap(),
            })
            .await
            .unwrap();
        let second = bus.consume("payment_1", 10).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn distinct_partitions_consume_independently() {
        let transport = Arc::new(InMemoryEventTransport::new());
        let bus = EventBus::new(transport, RetryPolicy::default());
        bus.publish(event("payment_1")).await.unwrap();
        bus.publish(event("payment_2")).await.unwrap();
        assert_eq!(bus.consume("payment_1", 10).await.unwrap().len(), 1);
        assert_eq!(bus.consume("payment_2", 10).await.unwrap().len(), 1);
    }
}
