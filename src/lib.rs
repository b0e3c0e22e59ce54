//! stub-relay: placeholder templating and deferred callback delivery for
//! mock servers.
//!
//! The serving layer hands each mocked exchange to [`serve::CallbackRelay`],
//! which rewrites templated response bodies and schedules any declared
//! callbacks. Callback payloads and destinations go through the same
//! placeholder engine before delivery on one of three channels (HTTP, queue,
//! topic), with spooled definitions, a bounded worker pool, and linear-backoff
//! retries.

// Core engine
pub mod document;
pub mod placeholder;

// Callback pipeline
pub mod callback;
pub mod channel;
pub mod scheduler;
pub mod spool;
pub mod transport;

// Boundary
pub mod serve;

// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use callback::{BasicAuth, CallbackDeclaration, ResolvedCallback};
pub use config::Settings;
pub use error::{DeliveryError, EngineError, EngineResult};
pub use serve::CallbackRelay;
