//! Default values for every configuration field.

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.qbraid.com/api/chat";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8787;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `<data_local_dir>/qchat/logs`, or `./logs` when the platform has none.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("qchat").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
