//! Redis-backed messaging transports.
//!
//! Queue delivery pushes onto a Redis list; topic delivery publishes to a
//! pub/sub channel whose full identifier lives in a registry set, scanned
//! page by page with `SSCAN`. Queue sends deliberately open and close a
//! connection per call — no pooling — so a dead broker never poisons later
//! sends through a stale session.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::error::{DeliveryError, DeliveryResult, EngineError, EngineResult};

use super::{QueueTransport, TopicTransport};

/// Pushes queue payloads onto Redis lists, one fresh connection per send.
pub struct RedisQueueTransport {
    client: redis::Client,
}

impl RedisQueueTransport {
    pub fn new(endpoint: &str) -> EngineResult<Self> {
        let client = redis::Client::open(endpoint).map_err(|err| {
            EngineError::Configuration(format!("Invalid messaging endpoint: {err}"))
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl QueueTransport for RedisQueueTransport {
    async fn send(&self, queue: &str, payload: &str) -> DeliveryResult<()> {
        // Fresh connection per send; dropped at the end of the call
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| DeliveryError::Retryable(format!("Queue connection failed: {err}")))?;

        let _: i64 = conn
            .rpush(queue, payload)
            .await
            .map_err(|err| DeliveryError::Retryable(format!("Queue publish failed: {err}")))?;

        tracing::debug!(queue = %queue, "Published callback payload to queue");
        Ok(())
    }
}

/// Lists the topic registry set and publishes to resolved channels.
pub struct RedisTopicTransport {
    client: redis::Client,
    registry_key: String,
    page_size: usize,
}

impl RedisTopicTransport {
    pub fn new(endpoint: &str, registry_key: String, page_size: usize) -> EngineResult<Self> {
        let client = redis::Client::open(endpoint).map_err(|err| {
            EngineError::Configuration(format!("Invalid messaging endpoint: {err}"))
        })?;
        Ok(Self {
            client,
            registry_key,
            page_size,
        })
    }
}

#[async_trait]
impl TopicTransport for RedisTopicTransport {
    async fn list_page(
        &self,
        cursor: Option<String>,
    ) -> DeliveryResult<(Vec<String>, Option<String>)> {
        let cursor: u64 = cursor
            .as_deref()
            .unwrap_or("0")
            .parse()
            .map_err(|_| DeliveryError::Fatal(format!("Invalid registry cursor: {cursor:?}")))?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| DeliveryError::Retryable(format!("Topic listing failed: {err}")))?;

        let (next, members): (u64, Vec<String>) = redis::cmd("SSCAN")
            .arg(&self.registry_key)
            .arg(cursor)
            .arg("COUNT")
            .arg(self.page_size)
            .query_async(&mut conn)
            .await
            .map_err(|err| DeliveryError::Retryable(format!("Topic listing failed: {err}")))?;

        let next = (next != 0).then(|| next.to_string());
        Ok((members, next))
    }

    async fn publish(&self, identifier: &str, payload: &str) -> DeliveryResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| DeliveryError::Retryable(format!("Topic connection failed: {err}")))?;

        let _: i64 = conn
            .publish(identifier, payload)
            .await
            .map_err(|err| DeliveryError::Retryable(format!("Topic publish failed: {err}")))?;

        tracing::debug!(identifier = %identifier, "Published callback payload to topic");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(RedisQueueTransport::new("not a url").is_err());
        assert!(RedisTopicTransport::new("not a url", "topics".into(), 10).is_err());
    }
}
