//! Scripted transport and catalog for tests and offline runs.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

use qchat_core::{ByteStream, ChatRequest, Credential, Model, ModelCatalog, Transport, TransportError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Reply {
    Chunks(Vec<Bytes>),
    ConnectError(TransportError),
    Controlled {
        rx: mpsc::UnboundedReceiver<Result<Bytes, TransportError>>,
        opened: Arc<Notify>,
    },
}

/// A transport that answers each request with the next scripted reply.
///
/// With the script exhausted, requests fail to connect.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
    released: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with these chunks, then end.
    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_chunks(chunks);
        self
    }

    pub fn push_chunks<I, S>(&self, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = chunks.into_iter().map(|c| Bytes::from(c.into())).collect();
        lock(&self.replies).push_back(Reply::Chunks(chunks));
    }

    /// Fail the next request before any body arrives.
    pub fn push_connect_error(&self, error: TransportError) {
        lock(&self.replies).push_back(Reply::ConnectError(error));
    }

    /// Reply with a stream fed by the returned controller.
    pub fn push_controlled(&self) -> StreamController {
        let (tx, rx) = mpsc::unbounded_channel();
        let opened = Arc::new(Notify::new());
        lock(&self.replies).push_back(Reply::Controlled {
            rx,
            opened: Arc::clone(&opened),
        });
        StreamController { tx, opened }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    /// Number of response streams dropped by their reader.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn track(&self, inner: ByteStream) -> ByteStream {
        Box::pin(TrackedStream {
            inner,
            released: Arc::clone(&self.released),
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_stream(
        &self,
        request: &ChatRequest,
        _credential: &Credential,
    ) -> Result<ByteStream, TransportError> {
        lock(&self.requests).push(request.clone());
        let reply = lock(&self.replies).pop_front();

        match reply {
            Some(Reply::Chunks(chunks)) => {
                let items = chunks.into_iter().map(Ok::<Bytes, TransportError>);
                Ok(self.track(Box::pin(futures::stream::iter(items))))
            }
            Some(Reply::ConnectError(e)) => Err(e),
            Some(Reply::Controlled { rx, opened }) => {
                let stream = self.track(Box::pin(UnboundedReceiverStream::new(rx)));
                opened.notify_one();
                Ok(stream)
            }
            None => Err(TransportError::Connect("no scripted reply".to_string())),
        }
    }
}

struct TrackedStream {
    inner: ByteStream,
    released: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Feeds one controlled mock stream.
pub struct StreamController {
    tx: mpsc::UnboundedSender<Result<Bytes, TransportError>>,
    opened: Arc<Notify>,
}

impl StreamController {
    /// Resolves once the transport has handed this stream to a reader.
    pub async fn opened(&self) {
        self.opened.notified().await;
    }

    /// Returns `false` once the reader has dropped the stream.
    pub fn send(&self, text: &str) -> bool {
        self.send_bytes(text.as_bytes())
    }

    pub fn send_bytes(&self, bytes: &[u8]) -> bool {
        self.tx.send(Ok(Bytes::copy_from_slice(bytes))).is_ok()
    }

    pub fn fail(&self, error: TransportError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// End the stream cleanly.
    pub fn finish(self) {}
}

/// Catalog that accepts a fixed set of keys.
#[derive(Default)]
pub struct MockCatalog {
    valid_keys: Vec<String>,
    models: Vec<Model>,
    validations: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_valid_key(mut self, key: impl Into<String>) -> Self {
        self.valid_keys.push(key.into());
        self
    }

    pub fn with_model(mut self, id: impl Into<String>, description: impl Into<String>) -> Self {
        self.models.push(Model::new(id, description));
        self
    }

    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    fn accepts(&self, credential: &Credential) -> bool {
        self.valid_keys.iter().any(|k| k == credential.expose())
    }
}

#[async_trait]
impl ModelCatalog for MockCatalog {
    async fn validate_credential(&self, credential: &Credential) -> bool {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.accepts(credential)
    }

    async fn list_models(&self, credential: &Credential) -> Vec<Model> {
        if self.accepts(credential) {
            self.models.clone()
        } else {
            Vec::new()
        }
    }
}
