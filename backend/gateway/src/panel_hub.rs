//! One coordinator shared by every connected panel.
//!
//! Panels queue their events into the same coordinator, so a prompt from any
//! panel supersedes whatever another panel started. Notifications are fanned
//! out to every attached panel. The coordinator lives while at least one
//! panel holds its event sender; the last panel to leave ends its loop, which
//! cancels the live session.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use qchat_core::{DisplaySink, Notification, UiEvent};
use qchat_session::{ChatContext, Coordinator};

/// Notifications a slow panel may fall behind by before it skips ahead.
pub const NOTIFICATION_BUFFER: usize = 256;

struct BroadcastSink(broadcast::Sender<Notification>);

impl DisplaySink for BroadcastSink {
    fn post(&self, notification: Notification) {
        if self.0.send(notification).is_err() {
            debug!("No panel attached, notification dropped");
        }
    }
}

#[derive(Default)]
struct Running {
    events: Option<mpsc::WeakUnboundedSender<UiEvent>>,
    task: Option<JoinHandle<()>>,
}

/// A panel's handles into the shared coordinator.
pub struct PanelLink {
    pub events: mpsc::UnboundedSender<UiEvent>,
    pub notifications: broadcast::Receiver<Notification>,
}

pub struct PanelHub {
    context: ChatContext,
    notifications: broadcast::Sender<Notification>,
    running: Mutex<Running>,
}

impl PanelHub {
    pub fn new(context: ChatContext) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            context,
            notifications,
            running: Mutex::new(Running::default()),
        }
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn attached_panels(&self) -> usize {
        self.notifications.receiver_count()
    }

    /// Join the running coordinator, starting one if no panel holds it.
    pub async fn attach(&self) -> PanelLink {
        let notifications = self.notifications.subscribe();
        let mut running = self.running.lock().await;

        if let Some(events) = running.events.as_ref().and_then(|weak| weak.upgrade()) {
            return PanelLink {
                events,
                notifications,
            };
        }

        // The previous coordinator has lost all its panels; let it cancel its
        // session before another one starts.
        if let Some(previous) = running.task.take() {
            if let Err(e) = previous.await {
                error!(error = %e, "Coordinator task failed");
            }
        }

        let (events, ui_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(BroadcastSink(self.notifications.clone()));
        let coordinator = Coordinator::new(self.context.clone(), sink);
        running.task = Some(tokio::spawn(coordinator.run(ui_rx)));
        running.events = Some(events.downgrade());
        info!("Coordinator started");

        PanelLink {
            events,
            notifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use qchat_core::Credential;
    use qchat_providers::MockTransport;
    use tokio::time::timeout;

    use super::*;

    fn hub(transport: Arc<MockTransport>) -> PanelHub {
        PanelHub::new(ChatContext::new(Credential::new("k"), transport))
    }

    async fn next(rx: &mut broadcast::Receiver<Notification>) -> Notification {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a notification")
            .expect("notification channel closed")
    }

    fn send(link: &PanelLink, prompt: &str) {
        link.events
            .send(UiEvent::SendMessage {
                prompt: prompt.into(),
                model: "m".into(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_prompt_from_second_panel_supersedes_first() {
        let transport = Arc::new(MockTransport::new());
        let first = transport.push_controlled();
        let second = transport.push_controlled();
        let hub = hub(transport.clone());

        let mut panel1 = hub.attach().await;
        let mut panel2 = hub.attach().await;
        assert_eq!(hub.attached_panels(), 2);

        send(&panel1, "a");
        first.opened().await;
        first.send("A1");
        let a1 = Notification::response(qchat_markdown::format("A1"));
        assert_eq!(next(&mut panel1.notifications).await, a1);
        assert_eq!(next(&mut panel2.notifications).await, a1);

        send(&panel2, "b");
        second.opened().await;
        timeout(Duration::from_secs(2), async {
            while transport.released() < 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("first panel's stream was not released");

        first.send("A2");
        second.send("B1");
        let b1 = Notification::response(qchat_markdown::format("B1"));
        assert_eq!(next(&mut panel1.notifications).await, b1);
        assert_eq!(next(&mut panel2.notifications).await, b1);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_last_panel_leaving_cancels_live_session() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_controlled();
        let hub = hub(transport.clone());

        let panel1 = hub.attach().await;
        let panel2 = hub.attach().await;
        send(&panel1, "q");
        stream.opened().await;

        drop(panel1);
        tokio::task::yield_now().await;
        assert_eq!(transport.released(), 0);

        drop(panel2);
        timeout(Duration::from_secs(2), async {
            while transport.released() < 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("stream was not released after the last panel left");
        assert_eq!(hub.attached_panels(), 0);
    }

    #[tokio::test]
    async fn test_panel_after_shutdown_gets_fresh_coordinator() {
        let transport = Arc::new(MockTransport::new().with_chunks(["one"]));
        transport.push_chunks(["two"]);
        let hub = hub(transport.clone());

        let mut panel = hub.attach().await;
        send(&panel, "first");
        assert_eq!(
            next(&mut panel.notifications).await,
            Notification::response(qchat_markdown::format("one"))
        );
        assert_eq!(next(&mut panel.notifications).await, Notification::End);
        drop(panel);

        let mut panel = hub.attach().await;
        send(&panel, "second");
        assert_eq!(
            next(&mut panel.notifications).await,
            Notification::response(qchat_markdown::format("two"))
        );
        assert_eq!(next(&mut panel.notifications).await, Notification::End);
    }
}
