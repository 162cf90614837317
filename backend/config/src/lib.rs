//! `qchat-config`: qchat runtime configuration.
//!
//! Provides:
//! - Typed config with defaults
//! - Loading from `QCHAT_*` environment variables
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod schema;
pub mod validation;

pub use env::ConfigError;
pub use schema::ChatConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};

/// Validate, log every finding, and refuse configs with errors.
///
/// Call after the logger is up so the findings reach the log file.
pub fn ensure_valid(config: &ChatConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("{first}");
    }

    Ok(())
}
