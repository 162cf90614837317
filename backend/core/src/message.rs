use serde::{Deserialize, Serialize};

/// Bubble shown when a generation fails on the transport.
pub const ERROR_HTML: &str =
    r#"<div class="status-message error">Error: Failed to generate response. Please try again.</div>"#;

/// Bubble shown when the user stops a generation.
pub const STOPPED_HTML: &str =
    r#"<div class="status-message error">Message generation stopped by user.</div>"#;

/// Intents forwarded by a display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum UiEvent {
    /// Surface → Coordinator: start a new exchange
    SendMessage { prompt: String, model: String },
    /// Surface → Coordinator: abort the running exchange
    StopGeneration,
    /// Surface → Coordinator: reset the transcript view
    ClearChat,
}

/// Notifications pushed to a display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Notification {
    /// Replaces the content of the pending bubble.
    Response(String),
    /// Finalizes the pending bubble.
    End,
    /// The surface should reset its transcript.
    ClearChat,
}

impl Notification {
    pub fn response(payload: impl Into<String>) -> Self {
        Notification::Response(payload.into())
    }
}
