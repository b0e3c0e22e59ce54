//! HTTP callback delivery.

use async_trait::async_trait;
use serde_json::json;

use crate::callback::ResolvedCallback;
use crate::config::HttpConfig;
use crate::error::{DeliveryError, DeliveryResult};
use crate::metrics::REPORT_FAILURES_TOTAL;

use super::ChannelHandler;

/// Header carrying the callback trace id on every delivery
pub const TRACE_HEADER: &str = "X-Relay-Trace-Id";

/// POSTs resolved payloads to the callback URL, then reports the outcome to
/// the local observability endpoint.
pub struct HttpChannel {
    client: reqwest::Client,
    report_enabled: bool,
    report_endpoint: String,
}

impl HttpChannel {
    pub fn new(config: &HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            report_enabled: config.report_enabled,
            report_endpoint: config.report_endpoint.clone(),
        }
    }

    /// Whether `status` counts as success: the declared status exactly when
    /// one was declared, any 2xx otherwise.
    fn status_matches(expected: Option<u16>, status: u16) -> bool {
        match expected {
            Some(code) => status == code,
            None => (200..300).contains(&status),
        }
    }

    /// Secondary observability report. Its failure is fatal for the reporting
    /// step only; the primary delivery has already succeeded.
    async fn report(&self, target: &str, status: u16, body: &str) -> DeliveryResult<()> {
        let payload = json!({
            "result": "success",
            "target": target,
            "response": {"status": status, "body": body},
        });

        self.client
            .post(&self.report_endpoint)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| DeliveryError::Fatal(format!("Result report failed: {err}")))?;

        Ok(())
    }
}

#[async_trait]
impl ChannelHandler for HttpChannel {
    fn name(&self) -> &'static str {
        "http"
    }

    fn accepts(&self, definition: &ResolvedCallback) -> bool {
        definition.url.is_some()
    }

    async fn deliver(&self, definition: &ResolvedCallback) -> DeliveryResult<()> {
        let url = definition
            .url
            .as_deref()
            .ok_or_else(|| DeliveryError::Fatal("Definition has no url".to_string()))?;

        let mut request = self
            .client
            .post(url)
            .header(TRACE_HEADER, &definition.trace_id)
            .json(&definition.data);

        if let Some(auth) = &definition.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request
            .send()
            .await
            .map_err(|err| DeliveryError::Retryable(format!("HTTP delivery failed: {err}")))?;

        let status = response.status().as_u16();
        if !Self::status_matches(definition.expected_status, status) {
            return Err(DeliveryError::Retryable(format!(
                "Unexpected callback status {status}"
            )));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::info!(
            target = %url,
            status = status,
            trace_id = %definition.trace_id,
            "Callback delivered"
        );

        if self.report_enabled {
            if let Err(err) = self.report(url, status, &body).await {
                REPORT_FAILURES_TOTAL.inc();
                tracing::error!(
                    target = %url,
                    error = %err,
                    "Delivery report failed after successful callback"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_status_is_exact() {
        assert!(HttpChannel::status_matches(Some(201), 201));
        assert!(!HttpChannel::status_matches(Some(201), 200));
        assert!(!HttpChannel::status_matches(Some(201), 202));
    }

    #[test]
    fn default_success_is_any_2xx() {
        assert!(HttpChannel::status_matches(None, 200));
        assert!(HttpChannel::status_matches(None, 299));
        assert!(!HttpChannel::status_matches(None, 302));
        assert!(!HttpChannel::status_matches(None, 500));
    }

    #[test]
    fn accepts_url_definitions_only() {
        let channel = HttpChannel::new(&HttpConfig::default());
        let mut definition = ResolvedCallback {
            delay_seconds: 0,
            url: Some("http://h/cb".to_string()),
            queue: None,
            topic: None,
            data: serde_json::Value::Null,
            auth: None,
            trace_id: "t".to_string(),
            expected_status: None,
        };
        assert!(channel.accepts(&definition));

        definition.url = None;
        definition.queue = Some("orders".to_string());
        assert!(!channel.accepts(&definition));
    }
}
