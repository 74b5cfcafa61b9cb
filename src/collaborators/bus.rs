use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::domain::error::GatewayError;

/// A raw, undecoded message as it sits on the wire (spec §4.6, §6). The
/// "smart" behaviors — schema validation, partition ordering guarantees,
/// dedup-on-consume — live in `engine::event_bus`; this collaborator only
/// carries bytes and a partition key.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub partition_key: String,
    pub payload: Vec<u8>,
}

/// Raw publish/consume transport (spec §6). Broker wire protocols (Kafka,
/// SQS, etc.) are out of scope (spec §1 Non-goals) — this is the minimal
/// contract: publish preserves order within a partition key, consume is
/// at-least-once.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn publish(&self, message: RawMessage) -> Result<(), GatewayError>;

    /// Pulls up to `max` messages for `partition_key`, preserving publish
    /// order within that key. At-least-once: a message stays available
    /// until explicitly acknowledged.
    async fn poll(&self, partition_key: &str, max: usize) -> Result<Vec<RawMessage>, GatewayError>;

    async fn ack(&self, partition_key: &str, count: usize) -> Result<(), GatewayError>;
}

/// In-process reference transport: one FIFO queue per partition key,
/// ack-by-count from the front (spec §4.6 "ordering preserved within a
/// partition key").
#[derive(Default)]
pub struct InMemoryEventTransport {
    partitions: Mutex<HashMap<String, VecDeque<RawMessage>>>,
}

impl InMemoryEventTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventTransport for InMemoryEventTransport {
    async fn publish(&self, message: RawMessage) -> Result<(), GatewayError> {
        let mut partitions = self.partitions.lock().unwrap();
        partitions
            .entry(message.partition_key.clone())
            .or_default()
            .push_back(message);
        Ok(())
    }

    async fn poll(&self, partition_key: &str, max: usize) -> Result<Vec<RawMessage>, GatewayError> {
        let partitions = self.partitions.lock().unwrap();
        Ok(partitions
            .get(partition_key)
            .map(|q| q.iter().take(max).cloned().collect())
            .unwrap_or_default())
    }

    async fn ack(&self, partition_key: &str, count: usize) -> Result<(), GatewayError> {
        let mut partitions = self.partitions.lock().unwrap();
        if let Some(queue) = partitions.get_mut(partition_key) {
            for _ in 0..count.min(queue.len()) {
                queue.pop_front();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(key: &str, body: &str) -> RawMessage {
        RawMessage { partition_key: key.to_string(), payload: body.as_bytes().to_vec() }
    }

    #[tokio::test]
    async fn preserves_order_within_partition() {
        let bus = InMemoryEventTransport::new();
        bus.publish(msg("p1", "a")).await.unwrap();
        bus.publish(msg("p1", "b")).await.unwrap();
        let polled = bus.poll("p1", 10).await.unwrap();
        assert_eq!(polled[0].payload, b"a");
        assert_eq!(polled[1].payload, b"b");
    }

    #[tokio::test]
    async fn ack_removes_from_front() {
        let bus = InMemoryEventTransport::new();
        bus.publish(msg("p1", "a")).await.unwrap();
        bus.publish(msg("p1", "b")).await.unwrap();
        bus.ack("p1", 1).await.unwrap();
        let remaining = bus.poll("p1", 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload, b"b");
    }

    #[tokio::test]
    async fn distinct_partitions_are_independent() {
        let bus = InMemoryEventTransport::new();
        bus.publish(msg("p1", "a")).await.unwrap();
        bus.publish(msg("p2", "x")).await.unwrap();
        assert_eq!(bus.poll("p1", 10).await.unwrap().len(), 1);
        assert_eq!(bus.poll("p2", 10).await.unwrap().len(), 1);
    }
}
