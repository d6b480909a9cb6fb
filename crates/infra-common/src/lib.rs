//! # Callflow infrastructure
//!
//! Ambient building blocks shared by the callflow crates:
//!
//! - [`errors`]: the infrastructure error type
//! - [`logging`]: tracing subscriber setup
//! - [`tasks`]: tracked task spawning with graceful shutdown

pub mod errors;
pub mod logging;
pub mod tasks;

pub use errors::{Error, Result};
pub use logging::{LoggingConfig, setup_logging};
pub use tasks::{LayerTaskManager, TaskStats};
