//! Single-session request coordinator.
//!
//! The coordinator owns the only mutable session state. UI events and stream
//! events are drained by one loop, so at most one session is live at a time
//! and every notification for a session is posted in arrival order. Stream
//! events carrying the id of a session that is no longer live are dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use qchat_core::{Credential, DisplaySink, Notification, Transport, UiEvent, STOPPED_HTML};

use crate::pump::{Pump, SessionEvent, StreamEvent};
use crate::session::{Session, SessionId};

/// What every session needs from its surroundings.
#[derive(Clone)]
pub struct ChatContext {
    pub credential: Credential,
    pub transport: Arc<dyn Transport>,
}

impl ChatContext {
    pub fn new(credential: Credential, transport: Arc<dyn Transport>) -> Self {
        Self {
            credential,
            transport,
        }
    }
}

impl std::fmt::Debug for ChatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatContext")
            .field("credential", &self.credential)
            .field("transport", &self.transport.name())
            .finish()
    }
}

pub struct Coordinator {
    context: ChatContext,
    sink: Arc<dyn DisplaySink>,
    stream_tx: mpsc::UnboundedSender<SessionEvent>,
    stream_rx: mpsc::UnboundedReceiver<SessionEvent>,
    live: Option<Session>,
}

impl Coordinator {
    pub fn new(context: ChatContext, sink: Arc<dyn DisplaySink>) -> Self {
        let (stream_tx, stream_rx) = mpsc::unbounded_channel();
        Self {
            context,
            sink,
            stream_tx,
            stream_rx,
            live: None,
        }
    }

    pub fn live_session(&self) -> Option<&Session> {
        self.live.as_ref()
    }

    /// Start a session for `prompt`, cancelling any live one first.
    pub fn submit(&mut self, prompt: impl Into<String>, model: impl Into<String>) -> SessionId {
        if let Some(mut previous) = self.live.take() {
            previous.cancel();
            debug!(session_id = %previous.id(), "Superseded by a new prompt");
        }

        let session = Session::new(prompt, model);
        let id = session.id();
        info!(
            session_id = %id,
            model = %session.request().model,
            prompt_chars = session.request().prompt.chars().count(),
            "Session started"
        );

        Pump {
            transport: Arc::clone(&self.context.transport),
            credential: self.context.credential.clone(),
            request: session.request().clone(),
            session_id: id,
            token: session.cancellation_token(),
        }
        .spawn(self.stream_tx.clone());

        self.sink.begin_response();
        self.live = Some(session);
        id
    }

    /// Stop the live session. Returns `false` when nothing was running.
    ///
    /// The stop notice and the end marker are posted before the token fires,
    /// and the session is silent afterwards, so nothing follows them.
    pub fn stop(&mut self) -> bool {
        let Some(mut session) = self.live.take() else {
            debug!("Stop requested with no live session");
            return false;
        };

        self.sink.post(Notification::response(STOPPED_HTML));
        self.sink.post(Notification::End);
        session.cancel();
        true
    }

    /// Clear the transcript. A live session keeps streaming.
    pub fn clear(&self) {
        self.sink.post(Notification::ClearChat);
    }

    pub fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::SendMessage { prompt, model } => {
                self.submit(prompt, model);
            }
            UiEvent::StopGeneration => {
                self.stop();
            }
            UiEvent::ClearChat => self.clear(),
        }
    }

    pub fn handle_stream_event(&mut self, event: SessionEvent) {
        let Some(session) = self.live.as_mut().filter(|s| s.id() == event.session_id) else {
            debug!(session_id = %event.session_id, "Dropping event for stale session");
            return;
        };

        let notifications = match event.event {
            StreamEvent::Chunk(bytes) => session.on_chunk(&bytes).into_iter().collect(),
            StreamEvent::End => session.on_end(),
            StreamEvent::Failed(e) => session.on_error(&e),
        };

        if session.state().is_terminal() {
            self.live = None;
        }

        for notification in notifications {
            self.sink.post(notification);
        }
    }

    /// Drain UI and stream events until the UI side closes, then cancel the
    /// live session.
    pub async fn run(mut self, mut ui_events: mpsc::UnboundedReceiver<UiEvent>) {
        loop {
            tokio::select! {
                ui = ui_events.recv() => match ui {
                    Some(event) => self.handle_ui_event(event),
                    None => break,
                },
                Some(event) = self.stream_rx.recv() => self.handle_stream_event(event),
            }
        }
        self.shutdown();
    }

    /// Cancel the live session without notifying the surface.
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.live.take() {
            if session.cancel() {
                warn!(session_id = %session.id(), "Surface closed with a live session");
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use qchat_core::{TransportError, ERROR_HTML};
    use qchat_providers::mock::MockTransport;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::*;

    struct Harness {
        transport: Arc<MockTransport>,
        ui: mpsc::UnboundedSender<UiEvent>,
        notifications: mpsc::UnboundedReceiver<Notification>,
        handle: JoinHandle<()>,
    }

    impl Harness {
        fn start(transport: MockTransport) -> Self {
            let transport = Arc::new(transport);
            let (sink_tx, notifications) = mpsc::unbounded_channel();
            let context = ChatContext::new(Credential::new("test-key"), transport.clone());
            let coordinator = Coordinator::new(context, Arc::new(sink_tx));
            let (ui, ui_rx) = mpsc::unbounded_channel();
            let handle = tokio::spawn(coordinator.run(ui_rx));
            Self {
                transport,
                ui,
                notifications,
                handle,
            }
        }

        fn send(&self, prompt: &str) {
            self.ui
                .send(UiEvent::SendMessage {
                    prompt: prompt.to_string(),
                    model: "test-model".to_string(),
                })
                .unwrap();
        }

        async fn next(&mut self) -> Notification {
            timeout(Duration::from_secs(2), self.notifications.recv())
                .await
                .expect("timed out waiting for a notification")
                .expect("sink closed")
        }

        /// Close the UI side, wait for the loop, and return anything posted late.
        async fn finish(mut self) -> Vec<Notification> {
            drop(self.ui);
            self.handle.await.unwrap();
            let mut rest = Vec::new();
            while let Ok(n) = self.notifications.try_recv() {
                rest.push(n);
            }
            rest
        }
    }

    fn rendered(text: &str) -> Notification {
        Notification::response(qchat_markdown::format(text))
    }

    #[tokio::test]
    async fn test_two_chunks_then_end() {
        let transport = MockTransport::new();
        let stream = transport.push_controlled();
        let mut h = Harness::start(transport);

        h.send("hi");
        stream.opened().await;
        stream.send("Hello");
        assert_eq!(h.next().await, rendered("Hello"));
        stream.send(" world");
        assert_eq!(h.next().await, rendered("Hello world"));
        stream.finish();
        assert_eq!(h.next().await, Notification::End);

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "hi");
        assert_eq!(requests[0].model, "test-model");
        assert!(requests[0].stream);

        assert!(h.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_new_prompt_supersedes_live_session() {
        let transport = MockTransport::new();
        let first = transport.push_controlled();
        let second = transport.push_controlled();
        let mut h = Harness::start(transport);

        h.send("a");
        first.opened().await;
        first.send("A1");
        assert_eq!(h.next().await, rendered("A1"));

        h.send("b");
        second.opened().await;
        first.send("A2");
        second.send("B1");
        assert_eq!(h.next().await, rendered("B1"));
        second.finish();
        assert_eq!(h.next().await, Notification::End);

        let transport = h.transport.clone();
        assert!(h.finish().await.is_empty());
        timeout(Duration::from_secs(2), async {
            while transport.released() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("superseded stream was not released");
    }

    #[tokio::test]
    async fn test_stop_posts_notice_then_end() {
        let transport = MockTransport::new();
        let stream = transport.push_controlled();
        let mut h = Harness::start(transport);

        h.send("long answer");
        stream.opened().await;
        stream.send("partial");
        assert_eq!(h.next().await, rendered("partial"));

        h.ui.send(UiEvent::StopGeneration).unwrap();
        assert_eq!(h.next().await, Notification::response(STOPPED_HTML));
        assert_eq!(h.next().await, Notification::End);

        stream.send("more");
        stream.finish();
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_session_is_noop() {
        let h = Harness::start(MockTransport::new());
        h.ui.send(UiEvent::StopGeneration).unwrap();
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_reports_error_and_recovers() {
        let transport = MockTransport::new();
        transport.push_connect_error(TransportError::Status {
            status: 503,
            body: "unavailable".into(),
        });
        transport.push_chunks(["ok"]);
        let mut h = Harness::start(transport);

        h.send("first");
        assert_eq!(h.next().await, Notification::response(ERROR_HTML));
        assert_eq!(h.next().await, Notification::End);

        h.send("second");
        assert_eq!(h.next().await, rendered("ok"));
        assert_eq!(h.next().await, Notification::End);
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure() {
        let transport = MockTransport::new();
        let stream = transport.push_controlled();
        let mut h = Harness::start(transport);

        h.send("q");
        stream.opened().await;
        stream.send("half");
        assert_eq!(h.next().await, rendered("half"));
        stream.fail(TransportError::Body("connection reset".into()));
        assert_eq!(h.next().await, Notification::response(ERROR_HTML));
        assert_eq!(h.next().await, Notification::End);
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_does_not_cancel() {
        let transport = MockTransport::new();
        let stream = transport.push_controlled();
        let mut h = Harness::start(transport);

        h.send("q");
        stream.opened().await;
        h.ui.send(UiEvent::ClearChat).unwrap();
        assert_eq!(h.next().await, Notification::ClearChat);

        stream.send("still here");
        assert_eq!(h.next().await, rendered("still here"));
        stream.finish();
        assert_eq!(h.next().await, Notification::End);
        assert!(h.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_closing_surface_cancels_live_session() {
        let transport = MockTransport::new();
        let stream = transport.push_controlled();
        let h = Harness::start(transport);

        h.send("q");
        stream.opened().await;
        let transport = h.transport.clone();
        assert!(h.finish().await.is_empty());

        timeout(Duration::from_secs(2), async {
            while transport.released() < 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("stream was not released on shutdown");
    }

    #[tokio::test]
    async fn test_stale_events_are_dropped() {
        let (sink_tx, mut notifications) = mpsc::unbounded_channel();
        let transport = Arc::new(MockTransport::new());
        let mut coordinator = Coordinator::new(
            ChatContext::new(Credential::new("k"), transport),
            Arc::new(sink_tx),
        );

        coordinator.handle_stream_event(SessionEvent {
            session_id: uuid::Uuid::new_v4(),
            event: StreamEvent::Chunk(bytes::Bytes::from_static(b"ghost")),
        });
        assert!(notifications.try_recv().is_err());
        assert!(coordinator.live_session().is_none());
    }

    #[derive(Default)]
    struct RecordingSink(std::sync::Mutex<Vec<String>>);

    impl DisplaySink for RecordingSink {
        fn post(&self, notification: Notification) {
            let entry = match notification {
                Notification::Response(markup) => markup,
                Notification::End => "end".to_string(),
                Notification::ClearChat => "clear".to_string(),
            };
            self.0.lock().unwrap().push(entry);
        }

        fn begin_response(&self) {
            self.0.lock().unwrap().push("begin".to_string());
        }
    }

    #[tokio::test]
    async fn test_each_submit_begins_a_response() {
        let sink = Arc::new(RecordingSink::default());
        let mut coordinator = Coordinator::new(
            ChatContext::new(Credential::new("k"), Arc::new(MockTransport::new())),
            sink.clone(),
        );

        let first = coordinator.submit("a", "m");
        coordinator.handle_stream_event(SessionEvent {
            session_id: first,
            event: StreamEvent::Chunk(bytes::Bytes::from_static(b"A")),
        });
        let second = coordinator.submit("b", "m");
        coordinator.handle_stream_event(SessionEvent {
            session_id: second,
            event: StreamEvent::Chunk(bytes::Bytes::from_static(b"B")),
        });

        let log = sink.0.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "begin".to_string(),
                qchat_markdown::format("A"),
                "begin".to_string(),
                qchat_markdown::format("B"),
            ]
        );
    }
}
