//! Delivery channels and provider selection.
//!
//! Each channel is a [`ChannelHandler`] with a predicate over the resolved
//! definition's populated destination field and an async delivery call that
//! classifies its own failures. The provider list is closed: HTTP, queue,
//! topic. Builder validation guarantees exactly one destination, so exactly
//! one predicate matches in practice; selection still iterates every
//! provider rather than hard-coding the mapping.

pub mod http;
pub mod queue;
pub mod topic;

pub use http::HttpChannel;
pub use queue::QueueChannel;
pub use topic::{TopicChannel, TopicNameCache};

use std::sync::Arc;

use async_trait::async_trait;

use crate::callback::ResolvedCallback;
use crate::error::DeliveryResult;

/// A delivery transport for resolved callbacks.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Channel label used in logs and metrics
    fn name(&self) -> &'static str;

    /// Whether this channel serves the definition's populated destination
    fn accepts(&self, definition: &ResolvedCallback) -> bool;

    /// Perform one delivery attempt, classifying any failure
    async fn deliver(&self, definition: &ResolvedCallback) -> DeliveryResult<()>;
}

/// Every handler whose predicate matches the definition.
pub fn select_handlers(
    handlers: &[Arc<dyn ChannelHandler>],
    definition: &ResolvedCallback,
) -> Vec<Arc<dyn ChannelHandler>> {
    handlers
        .iter()
        .filter(|handler| handler.accepts(definition))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::transport::memory::{MemoryQueueTransport, MemoryTopicTransport};
    use serde_json::json;

    fn definition_with_queue() -> ResolvedCallback {
        ResolvedCallback {
            delay_seconds: 0,
            url: None,
            queue: Some("orders".to_string()),
            topic: None,
            data: json!({}),
            auth: None,
            trace_id: "t".to_string(),
            expected_status: None,
        }
    }

    #[test]
    fn selection_matches_populated_destination() {
        let handlers: Vec<Arc<dyn ChannelHandler>> = vec![
            Arc::new(HttpChannel::new(&HttpConfig::default())),
            Arc::new(QueueChannel::new(Arc::new(MemoryQueueTransport::new()))),
            Arc::new(TopicChannel::new(
                Arc::new(MemoryTopicTransport::new(vec![], 10)),
                Arc::new(TopicNameCache::new()),
            )),
        ];

        let selected = select_handlers(&handlers, &definition_with_queue());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "queue");
    }
}
