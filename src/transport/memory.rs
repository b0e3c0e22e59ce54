//! In-memory transports for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{DeliveryError, DeliveryResult};

use super::{QueueTransport, TopicTransport};

/// Queue transport storing payloads per queue name.
#[derive(Default)]
pub struct MemoryQueueTransport {
    queues: DashMap<String, Vec<String>>,
    fail_sends: AtomicUsize,
}

impl MemoryQueueTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sends fail with a retryable error.
    pub fn fail_next(&self, count: usize) {
        self.fail_sends.store(count, Ordering::SeqCst);
    }

    /// Payloads delivered to a queue so far.
    pub fn messages(&self, queue: &str) -> Vec<String> {
        self.queues
            .get(queue)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueueTransport for MemoryQueueTransport {
    async fn send(&self, queue: &str, payload: &str) -> DeliveryResult<()> {
        let remaining = self.fail_sends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_sends.store(remaining - 1, Ordering::SeqCst);
            return Err(DeliveryError::Retryable("Injected send failure".to_string()));
        }

        self.queues
            .entry(queue.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }
}

/// Topic transport serving a fixed registry, with a call counter so tests can
/// assert the resolution cache is doing its job.
pub struct MemoryTopicTransport {
    registry: Vec<String>,
    page_size: usize,
    published: DashMap<String, Vec<String>>,
    list_calls: AtomicUsize,
}

impl MemoryTopicTransport {
    pub fn new(registry: Vec<String>, page_size: usize) -> Self {
        Self {
            registry,
            page_size: page_size.max(1),
            published: DashMap::new(),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Payloads published to an identifier so far.
    pub fn published(&self, identifier: &str) -> Vec<String> {
        self.published
            .get(identifier)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of `list_page` calls made against this transport.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopicTransport for MemoryTopicTransport {
    async fn list_page(
        &self,
        cursor: Option<String>,
    ) -> DeliveryResult<(Vec<String>, Option<String>)> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let start: usize = cursor
            .as_deref()
            .unwrap_or("0")
            .parse()
            .map_err(|_| DeliveryError::Fatal(format!("Invalid registry cursor: {cursor:?}")))?;
        let end = (start + self.page_size).min(self.registry.len());
        let page = self.registry[start..end].to_vec();
        let next = (end < self.registry.len()).then(|| end.to_string());
        Ok((page, next))
    }

    async fn publish(&self, identifier: &str, payload: &str) -> DeliveryResult<()> {
        self.published
            .entry(identifier.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_records_sends() {
        let transport = MemoryQueueTransport::new();
        transport.send("orders", "one").await.unwrap();
        transport.send("orders", "two").await.unwrap();
        assert_eq!(transport.messages("orders"), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn queue_injected_failures_are_retryable() {
        let transport = MemoryQueueTransport::new();
        transport.fail_next(1);
        let err = transport.send("orders", "x").await.unwrap_err();
        assert!(err.is_retryable());
        transport.send("orders", "x").await.unwrap();
    }

    #[tokio::test]
    async fn topic_listing_paginates() {
        let registry: Vec<String> = (0..5).map(|i| format!("chan:{i}")).collect();
        let transport = MemoryTopicTransport::new(registry, 2);

        let (first, cursor) = transport.list_page(None).await.unwrap();
        assert_eq!(first.len(), 2);
        let (second, cursor) = transport.list_page(cursor).await.unwrap();
        assert_eq!(second.len(), 2);
        let (third, cursor) = transport.list_page(cursor).await.unwrap();
        assert_eq!(third.len(), 1);
        assert!(cursor.is_none());
    }
}
