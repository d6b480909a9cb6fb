pub mod setup;

pub use setup::{LoggingConfig, setup_logging, parse_log_level, log_welcome};
