//! Config validation with user-friendly error messages.

use crate::schema::ChatConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ChatConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_api_url(config, &mut report);
    validate_listener(config, &mut report);
    report
}

fn validate_api_url(config: &ChatConfig, report: &mut ValidationReport) {
    let url = config.api_url.as_str();
    if url.starts_with("https://") {
        return;
    }
    if url.starts_with("http://") {
        report.warn("api_url", "API URL is not HTTPS; the key is sent in clear text");
    } else {
        report.error("api_url", format!("API URL must be http(s), got {url:?}"));
    }
}

fn validate_listener(config: &ChatConfig, report: &mut ValidationReport) {
    if config.bind_address.trim().is_empty() {
        report.error("bind_address", "Bind address cannot be empty");
    }
    if config.port == 0 {
        report.error("port", "Port must be > 0");
    }
}
