use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub spool: SpoolConfig,
}

/// Worker pool and retry policy for scheduled callbacks
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Requested number of concurrent delivery workers; an enforced floor
    /// applies regardless of this value
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Linear backoff unit in milliseconds (delay = unit × attempt)
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Maximum retry attempts after the first failure (0 disables retries)
    #[serde(default)]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Whether to POST a delivery report after each successful callback
    #[serde(default = "default_report_enabled")]
    pub report_enabled: bool,
    /// Local observability endpoint receiving delivery reports
    #[serde(default = "default_report_endpoint")]
    pub report_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Whether queue/topic delivery is available at all
    #[serde(default)]
    pub enabled: bool,
    /// Messaging endpoint (Redis URL)
    #[serde(default = "default_messaging_endpoint")]
    pub endpoint: String,
    /// Registry set holding the full identifiers topics resolve against
    #[serde(default = "default_topic_registry_key")]
    pub topic_registry_key: String,
    /// Page size for registry scans during topic resolution
    #[serde(default = "default_topic_page_size")]
    pub topic_page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoolConfig {
    /// Directory holding spooled callback definitions while they wait
    #[serde(default = "default_spool_dir")]
    pub dir: String,
}

fn default_workers() -> usize {
    8
}

fn default_backoff_unit_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_report_enabled() -> bool {
    true
}

fn default_report_endpoint() -> String {
    "http://localhost:8080/callback/result".to_string()
}

fn default_messaging_endpoint() -> String {
    "redis://localhost:6379".to_string()
}

fn default_topic_registry_key() -> String {
    "relay:topics".to_string()
}

fn default_topic_page_size() -> usize {
    100
}

fn default_spool_dir() -> String {
    env::temp_dir()
        .join("stub-relay-spool")
        .to_string_lossy()
        .into_owned()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("scheduler.workers", default_workers() as i64)?
            .set_default("scheduler.backoff_unit_ms", default_backoff_unit_ms() as i64)?
            .set_default("scheduler.max_retries", 0i64)?
            .set_default("messaging.endpoint", default_messaging_endpoint())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SCHEDULER_WORKERS, HTTP_REPORT_ENDPOINT, MESSAGING_ENDPOINT, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }
}

impl SchedulerConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backoff_unit_ms: default_backoff_unit_ms(),
            max_retries: 0,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            report_enabled: default_report_enabled(),
            report_endpoint: default_report_endpoint(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_messaging_endpoint(),
            topic_registry_key: default_topic_registry_key(),
            topic_page_size: default_topic_page_size(),
        }
    }
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            dir: default_spool_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.workers, 8);
        assert_eq!(scheduler.max_retries, 0);
        assert_eq!(scheduler.backoff_unit(), Duration::from_secs(5));
    }

    #[test]
    fn test_http_defaults() {
        let http = HttpConfig::default();
        assert!(http.report_enabled);
        assert!(http.report_endpoint.ends_with("/callback/result"));
        assert_eq!(http.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_messaging_disabled_by_default() {
        let messaging = MessagingConfig::default();
        assert!(!messaging.enabled);
        assert_eq!(messaging.topic_page_size, 100);
    }
}
