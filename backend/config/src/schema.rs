//! Typed runtime configuration.

use std::path::PathBuf;

use crate::defaults::{
    default_log_dir, DEFAULT_API_URL, DEFAULT_BIND_ADDRESS, DEFAULT_LOG_LEVEL, DEFAULT_PORT,
};

#[derive(Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the hosted chat endpoint; `/models` is appended for the catalog.
    pub api_url: String,
    /// Initial credential; the bootstrap prompts when absent or rejected.
    pub api_key: Option<String>,
    pub bind_address: String,
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl ChatConfig {
    /// `bind_address:port` for the gateway listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            log_dir: default_log_dir(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// Hand-written so the key never reaches a log line.
impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}
