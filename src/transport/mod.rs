//! Messaging transport seam for queue and topic delivery.
//!
//! Channel handlers talk to these traits, never to a concrete broker. The
//! Redis implementations are the production path; the in-memory ones back the
//! test suite. Both sides classify failures as retryable transport errors —
//! anything non-transport is the handler's call.

pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MessagingConfig;
use crate::error::{DeliveryError, DeliveryResult};

/// Publishes payloads to named queues.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Deliver one payload to `queue` over a fresh connection.
    async fn send(&self, queue: &str, payload: &str) -> DeliveryResult<()>;
}

/// Lists registered topic identifiers and publishes to them.
#[async_trait]
pub trait TopicTransport: Send + Sync {
    /// One page of registered identifiers plus the cursor for the next page
    /// (`None` when the listing is exhausted).
    async fn list_page(
        &self,
        cursor: Option<String>,
    ) -> DeliveryResult<(Vec<String>, Option<String>)>;

    /// Publish one payload to a fully resolved identifier.
    async fn publish(&self, identifier: &str, payload: &str) -> DeliveryResult<()>;
}

/// Build the transport pair from messaging configuration.
///
/// With messaging disabled, both transports fail fast with a fatal outcome so
/// misdirected queue/topic callbacks surface in the logs instead of hanging.
pub fn create_transports(
    config: &MessagingConfig,
) -> crate::error::EngineResult<(Arc<dyn QueueTransport>, Arc<dyn TopicTransport>)> {
    if !config.enabled {
        tracing::info!("Messaging disabled, queue/topic callbacks will fail fast");
        return Ok((Arc::new(DisabledTransport), Arc::new(DisabledTransport)));
    }

    tracing::info!(endpoint = %config.endpoint, "Creating Redis messaging transports");
    let queue = redis::RedisQueueTransport::new(&config.endpoint)?;
    let topic = redis::RedisTopicTransport::new(
        &config.endpoint,
        config.topic_registry_key.clone(),
        config.topic_page_size,
    )?;
    Ok((Arc::new(queue), Arc::new(topic)))
}

/// Stand-in used when messaging is disabled by configuration.
struct DisabledTransport;

#[async_trait]
impl QueueTransport for DisabledTransport {
    async fn send(&self, _queue: &str, _payload: &str) -> DeliveryResult<()> {
        Err(DeliveryError::Fatal(
            "Messaging is disabled by configuration".to_string(),
        ))
    }
}

#[async_trait]
impl TopicTransport for DisabledTransport {
    async fn list_page(
        &self,
        _cursor: Option<String>,
    ) -> DeliveryResult<(Vec<String>, Option<String>)> {
        Err(DeliveryError::Fatal(
            "Messaging is disabled by configuration".to_string(),
        ))
    }

    async fn publish(&self, _identifier: &str, _payload: &str) -> DeliveryResult<()> {
        Err(DeliveryError::Fatal(
            "Messaging is disabled by configuration".to_string(),
        ))
    }
}
