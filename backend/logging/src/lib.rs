//! Structured logging for qchat.
//!
//! Handles subscriber setup (console plus rolling NDJSON file) and scrubbing
//! of credentials from text before it reaches a log line.

pub mod logger;
pub mod redact;

pub use logger::{init_file_logger, init_logger};
pub use redact::{redact_secret, redact_sensitive_data};
