//! Topic callback delivery with cached name resolution.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::callback::ResolvedCallback;
use crate::error::{DeliveryError, DeliveryResult};
use crate::transport::TopicTransport;

use super::ChannelHandler;

/// Process-wide cache from logical topic name to full transport identifier.
///
/// Populated lazily on first use and shared by every task; entries are never
/// evicted. Concurrent misses may both walk the registry — the worst case is
/// one redundant remote listing, never a corrupt entry.
pub struct TopicNameCache {
    entries: DashMap<String, String>,
}

impl TopicNameCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, name: &str, identifier: String) {
        self.entries.insert(name.to_string(), identifier);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TopicNameCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves logical topic names against the transport registry and publishes
/// resolved payloads. An unresolvable name is fatal; a publish failure is
/// retryable.
pub struct TopicChannel {
    transport: Arc<dyn TopicTransport>,
    cache: Arc<TopicNameCache>,
}

impl TopicChannel {
    pub fn new(transport: Arc<dyn TopicTransport>, cache: Arc<TopicNameCache>) -> Self {
        Self { transport, cache }
    }

    /// Walk the paginated registry until an identifier matches the logical
    /// name exactly or by `:{name}` suffix.
    async fn resolve(&self, name: &str) -> DeliveryResult<String> {
        if let Some(identifier) = self.cache.get(name) {
            return Ok(identifier);
        }

        let suffix = format!(":{name}");
        let mut cursor = None;
        loop {
            let (page, next) = self.transport.list_page(cursor).await?;
            if let Some(found) = page
                .into_iter()
                .find(|id| id == name || id.ends_with(&suffix))
            {
                self.cache.insert(name, found.clone());
                tracing::debug!(topic = %name, identifier = %found, "Resolved topic name");
                return Ok(found);
            }
            match next {
                Some(token) => cursor = Some(token),
                None => {
                    return Err(DeliveryError::Fatal(format!(
                        "Topic `{name}` not found in registry"
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl ChannelHandler for TopicChannel {
    fn name(&self) -> &'static str {
        "topic"
    }

    fn accepts(&self, definition: &ResolvedCallback) -> bool {
        definition.topic.is_some()
    }

    async fn deliver(&self, definition: &ResolvedCallback) -> DeliveryResult<()> {
        let topic = definition
            .topic
            .as_deref()
            .ok_or_else(|| DeliveryError::Fatal("Definition has no topic".to_string()))?;

        let identifier = self.resolve(topic).await?;
        self.transport
            .publish(&identifier, &definition.payload_text())
            .await?;

        tracing::info!(
            topic = %topic,
            identifier = %identifier,
            trace_id = %definition.trace_id,
            "Callback published to topic"
        );
        Ok(())
    }
}
