//! Observability
//!
//! Logging setup shared by the library crates, the CLI and the tests.

pub mod logging;

pub use logging::{LogConfig, LogLevel, LogOutput};
