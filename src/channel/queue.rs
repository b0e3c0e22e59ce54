//! Queue callback delivery.

use std::sync::Arc;

use async_trait::async_trait;

use crate::callback::ResolvedCallback;
use crate::error::{DeliveryError, DeliveryResult};
use crate::transport::QueueTransport;

use super::ChannelHandler;

/// Publishes resolved payloads to a named queue. The transport opens a fresh
/// connection per send; failures it reports are retryable, everything else
/// here is fatal.
pub struct QueueChannel {
    transport: Arc<dyn QueueTransport>,
}

impl QueueChannel {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ChannelHandler for QueueChannel {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn accepts(&self, definition: &ResolvedCallback) -> bool {
        definition.queue.is_some()
    }

    async fn deliver(&self, definition: &ResolvedCallback) -> DeliveryResult<()> {
        let queue = definition
            .queue
            .as_deref()
            .ok_or_else(|| DeliveryError::Fatal("Definition has no queue".to_string()))?;

        self.transport
            .send(queue, &definition.payload_text())
            .await?;

        tracing::info!(
            queue = %queue,
            trace_id = %definition.trace_id,
            "Callback published to queue"
        );
        Ok(())
    }
}
