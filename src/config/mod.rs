mod settings;

pub use settings::{HttpConfig, MessagingConfig, SchedulerConfig, Settings, SpoolConfig};
