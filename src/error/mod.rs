use thiserror::Error;

/// Errors raised while resolving templates or building callback definitions.
///
/// Every variant is fatal for the serve-time operation that triggered it:
/// nothing here is retried, and no task is scheduled once one surfaces.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Spool error: {0}")]
    Spool(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Delivery failure classification consumed by the scheduler.
///
/// The retryable/fatal split is carried as an explicit variant rather than an
/// error hierarchy; the scheduler only ever asks `is_retryable`.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Retryable delivery failure: {0}")]
    Retryable(String),

    #[error("Fatal delivery failure: {0}")]
    Fatal(String),
}

impl DeliveryError {
    /// Whether the scheduler may re-fire the task for this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Result type for channel delivery attempts
pub type DeliveryResult<T> = Result<T, DeliveryError>;
