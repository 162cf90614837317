use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TransportError;
use crate::message::Notification;
use crate::types::{ChatRequest, Credential, Model};

/// Chunked response body of a streaming request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Issues streaming chat requests against the hosted endpoint.
///
/// Dropping the returned stream releases the underlying connection; that is
/// how callers abort an in-flight request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (e.g., "qbraid", "mock").
    fn name(&self) -> &str;

    /// Send `request` and return the response body as a chunk stream.
    async fn open_stream(
        &self,
        request: &ChatRequest,
        credential: &Credential,
    ) -> Result<ByteStream, TransportError>;
}

/// Credential validation and the model catalog.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Any network or auth failure collapses to `false`.
    async fn validate_credential(&self, credential: &Credential) -> bool;

    /// Empty on any failure.
    async fn list_models(&self, credential: &Credential) -> Vec<Model>;
}

/// Receives formatted notifications for display.
pub trait DisplaySink: Send + Sync {
    /// Fire-and-forget delivery, in call order.
    fn post(&self, notification: Notification);

    /// A new session was started; later responses belong to a fresh bubble.
    ///
    /// Ordered with `post`. Panels open the bubble themselves when the user
    /// sends, so the default does nothing.
    fn begin_response(&self) {}
}

impl DisplaySink for mpsc::UnboundedSender<Notification> {
    fn post(&self, notification: Notification) {
        if self.send(notification).is_err() {
            debug!("Display surface closed, notification dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.post(Notification::response("a"));
        tx.post(Notification::End);

        assert_eq!(rx.recv().await, Some(Notification::response("a")));
        assert_eq!(rx.recv().await, Some(Notification::End));
    }

    #[test]
    fn test_closed_sink_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel::<Notification>();
        drop(rx);
        tx.post(Notification::ClearChat);
    }
}
