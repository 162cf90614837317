//! One prompt-to-response exchange.
//!
//! A `Session` is a plain state machine: each handler consumes one stream
//! event and returns the notifications the surface should receive. Terminal
//! states are absorbing and every handler is a no-op once the cancellation
//! token has fired.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use qchat_core::{ChatRequest, Notification, TransportError, ERROR_HTML};

pub type SessionId = Uuid;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Request issued, nothing received yet
    Pending,
    /// At least one chunk received
    Streaming,
    /// Stream ended cleanly
    Completed,
    /// Superseded or stopped by the user
    Cancelled,
    /// Transport error
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }

    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Pending => "pending",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    request: ChatRequest,
    accumulated: String,
    /// Trailing bytes of a UTF-8 sequence split across chunks.
    partial_utf8: Vec<u8>,
    state: SessionState,
    token: CancellationToken,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request: ChatRequest::streaming(prompt, model),
            accumulated: String::new(),
            partial_utf8: Vec::new(),
            state: SessionState::Pending,
            token: CancellationToken::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated
    }

    /// Handle for the pump; it observes cancellation but never owns the session.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn accepts_events(&self) -> bool {
        self.state.is_live() && !self.token.is_cancelled()
    }

    /// Append a chunk and return the re-formatted full text.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> Option<Notification> {
        if !self.accepts_events() {
            debug!(session_id = %self.id, bytes = chunk.len(), "Chunk discarded");
            return None;
        }

        self.decode(chunk);
        if self.state == SessionState::Pending {
            self.state = SessionState::Streaming;
        }

        Some(Notification::response(qchat_markdown::format(&self.accumulated)))
    }

    /// The stream ended without error.
    pub fn on_end(&mut self) -> Vec<Notification> {
        if !self.accepts_events() {
            return Vec::new();
        }

        let mut notifications = Vec::new();
        if !self.partial_utf8.is_empty() {
            let tail = std::mem::take(&mut self.partial_utf8);
            self.accumulated.push_str(&String::from_utf8_lossy(&tail));
            notifications.push(Notification::response(qchat_markdown::format(
                &self.accumulated,
            )));
        }

        self.state = SessionState::Completed;
        info!(
            session_id = %self.id,
            chars = self.accumulated.chars().count(),
            elapsed_ms = self.elapsed_ms(),
            "Session completed"
        );
        notifications.push(Notification::End);
        notifications
    }

    /// The transport failed, before or after the first chunk.
    pub fn on_error(&mut self, error: &TransportError) -> Vec<Notification> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        if self.token.is_cancelled() || error.is_cancelled() {
            self.token.cancel();
            self.state = SessionState::Cancelled;
            debug!(session_id = %self.id, "Stream closed after cancellation");
            return Vec::new();
        }

        warn!(
            session_id = %self.id,
            state = %self.state,
            error = %error,
            "Session failed"
        );
        self.state = SessionState::Failed;
        vec![Notification::response(ERROR_HTML), Notification::End]
    }

    /// Trigger the token. Returns `false` if it had already fired.
    pub fn cancel(&mut self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        if self.state.is_live() {
            self.state = SessionState::Cancelled;
            info!(
                session_id = %self.id,
                elapsed_ms = self.elapsed_ms(),
                "Session cancelled"
            );
        }
        true
    }

    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.partial_utf8.extend_from_slice(chunk);
        let mut buf = std::mem::take(&mut self.partial_utf8);

        loop {
            match std::str::from_utf8(&buf) {
                Ok(text) => {
                    self.accumulated.push_str(text);
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.accumulated
                        .push_str(&String::from_utf8_lossy(&buf[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            self.partial_utf8 = buf.split_off(valid);
                            break;
                        }
                        Some(len) => {
                            self.accumulated.push(char::REPLACEMENT_CHARACTER);
                            buf.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }
}
