//! Transport-to-coordinator forwarding task.
//!
//! The pump opens the response stream and forwards every chunk, the end
//! marker, or the failure into the coordinator queue tagged with its session
//! id. It never touches session state. When the token fires it stops reading
//! and drops the stream, which releases the underlying connection.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use qchat_core::{ChatRequest, Credential, Transport, TransportError};

use crate::session::SessionId;

#[derive(Debug)]
pub enum StreamEvent {
    Chunk(Bytes),
    End,
    Failed(TransportError),
}

/// A stream event addressed to one session.
#[derive(Debug)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub event: StreamEvent,
}

pub struct Pump {
    pub transport: Arc<dyn Transport>,
    pub credential: Credential,
    pub request: ChatRequest,
    pub session_id: SessionId,
    pub token: CancellationToken,
}

impl Pump {
    pub fn spawn(self, events: mpsc::UnboundedSender<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    async fn run(self, events: mpsc::UnboundedSender<SessionEvent>) {
        let session_id = self.session_id;
        let forward = |event: StreamEvent| events.send(SessionEvent { session_id, event }).is_ok();

        let opened = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!(%session_id, "Cancelled before the stream opened");
                return;
            }
            result = self.transport.open_stream(&self.request, &self.credential) => result,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                forward(StreamEvent::Failed(e));
                return;
            }
        };

        debug!(%session_id, transport = self.transport.name(), "Stream opened");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!(%session_id, "Stream released after cancellation");
                    break;
                }
                next = stream.next() => next,
            };

            let delivered = match next {
                Some(Ok(chunk)) => {
                    trace!(%session_id, bytes = chunk.len(), "Chunk received");
                    forward(StreamEvent::Chunk(chunk))
                }
                Some(Err(e)) => {
                    forward(StreamEvent::Failed(e));
                    break;
                }
                None => {
                    forward(StreamEvent::End);
                    break;
                }
            };

            if !delivered {
                debug!(%session_id, "Coordinator gone; dropping stream");
                break;
            }
        }
    }
}
