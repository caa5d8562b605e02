// Library root — exposes internals for integration tests.
// The binary entry point is src/main.rs.

pub mod bootstrap;
pub mod comms;
pub mod core;
pub mod llm;
pub mod relay;

pub use crate::bootstrap::logger;
pub use crate::core::{config, error};
