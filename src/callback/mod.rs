//! Callback declarations and their fully resolved definitions.

mod builder;

pub use builder::CallbackBuilder;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callback as declared on a mock response.
///
/// Exactly one of `url`, `queue`, `topic` must be set; the destination and
/// `data` may carry placeholder tokens resolved against the triggering
/// request/response at serve time.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackDeclaration {
    /// Delay before the first delivery attempt
    #[serde(default, alias = "delay")]
    pub delay_seconds: u64,

    /// HTTP destination (POST target)
    #[serde(default)]
    pub url: Option<String>,

    /// Queue destination (logical queue name)
    #[serde(default)]
    pub queue: Option<String>,

    /// Topic destination (logical topic name, resolved by suffix match)
    #[serde(default)]
    pub topic: Option<String>,

    /// Preemptive basic credentials for HTTP delivery
    #[serde(default)]
    pub auth: Option<BasicAuth>,

    /// Trace id propagated on delivery; generated when absent
    #[serde(default)]
    pub trace_id: Option<String>,

    /// Payload template (placeholder tokens allowed anywhere inside)
    #[serde(default)]
    pub data: Value,

    /// Expected HTTP status; when absent any 2xx counts as success
    #[serde(default)]
    pub expected_status: Option<u16>,
}

/// Basic credentials for outbound HTTP delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// A declaration after all templating has been applied.
///
/// Immutable once built; the only mutable delivery state is the attempt
/// counter owned by the scheduled task. Serde round-trips through the spool
/// store unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedCallback {
    pub delay_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<BasicAuth>,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
}

impl ResolvedCallback {
    /// The populated destination, whichever channel it belongs to
    pub fn target(&self) -> &str {
        self.url
            .as_deref()
            .or(self.queue.as_deref())
            .or(self.topic.as_deref())
            .unwrap_or_default()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Payload as wire text: raw string contents when the data is textual,
    /// JSON serialization otherwise
    pub fn payload_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
