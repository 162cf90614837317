use thiserror::Error;

/// Top-level error type for qchat.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("an API key is required to use qchat")]
    CredentialRequired,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures surfaced by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// True when the failure was caused by the caller aborting the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}
