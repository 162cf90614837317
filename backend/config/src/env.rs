//! Loading configuration from environment variables.
//!
//! Unset or empty variables fall back to defaults. `from_vars` takes an
//! explicit map so tests never touch the process environment.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::ChatConfig;

pub const API_URL_VAR: &str = "QCHAT_API_URL";
pub const API_KEY_VAR: &str = "QCHAT_API_KEY";
pub const BIND_VAR: &str = "QCHAT_BIND";
pub const PORT_VAR: &str = "QCHAT_PORT";
pub const LOG_DIR_VAR: &str = "QCHAT_LOG_DIR";
pub const LOG_LEVEL_VAR: &str = "RUST_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ChatConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&unicode_vars(std::env::vars_os()))
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut config = ChatConfig::default();

        if let Some(url) = get(API_URL_VAR) {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        config.api_key = get(API_KEY_VAR);
        if let Some(bind) = get(BIND_VAR) {
            config.bind_address = bind;
        }
        if let Some(port) = get(PORT_VAR) {
            config.port = port.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidVar {
                    var: PORT_VAR,
                    value: port.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(dir) = get(LOG_DIR_VAR) {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(level) = get(LOG_LEVEL_VAR) {
            config.log_level = level;
        }

        Ok(config)
    }
}

/// Keep the variables whose name and value are both valid Unicode.
fn unicode_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_env_gives_defaults() {
        let config = ChatConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn test_all_vars_applied() {
        let config = ChatConfig::from_vars(&vars(&[
            (API_URL_VAR, "http://localhost:9000/api/chat/"),
            (API_KEY_VAR, " qbr_key "),
            (BIND_VAR, "0.0.0.0"),
            (PORT_VAR, "9100"),
            (LOG_DIR_VAR, "/tmp/qchat-logs"),
            (LOG_LEVEL_VAR, "qchat_session=debug"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:9000/api/chat");
        assert_eq!(config.api_key.as_deref(), Some("qbr_key"));
        assert_eq!(config.listen_addr(), "0.0.0.0:9100");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/qchat-logs"));
        assert_eq!(config.log_level, "qchat_session=debug");
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = ChatConfig::from_vars(&vars(&[(API_KEY_VAR, "   "), (PORT_VAR, "")])).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.port, 8787);
    }

    #[test]
    fn test_bad_port_rejected() {
        let err = ChatConfig::from_vars(&vars(&[(PORT_VAR, "http")])).unwrap_err();
        assert!(err.to_string().contains(PORT_VAR));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_vars_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let raw = vec![
            (OsString::from(PORT_VAR), OsString::from("9100")),
            (OsString::from("BROKEN"), OsString::from_vec(vec![0x66, 0xff, 0x6f])),
            (OsString::from_vec(vec![0xfe]), OsString::from("x")),
        ];
        let vars = unicode_vars(raw);
        assert_eq!(vars.len(), 1);
        assert_eq!(ChatConfig::from_vars(&vars).unwrap().port, 9100);
    }
}
