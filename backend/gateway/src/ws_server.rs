//! WebSocket entrypoint and connection handler.
//!
//! Each connection is one chat panel attached to the shared coordinator.
//! Inbound text frames are panel events; every notification goes out to all
//! panels as one text frame.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use qchat_core::{Notification, UiEvent};

use crate::panel_hub::PanelLink;
use crate::server::GatewayState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    let PanelLink {
        events,
        mut notifications,
    } = state.hub.attach().await;
    info!(panels = state.hub.attached_panels(), "Chat panel connected");

    // Forward notifications to the websocket
    let mut send_task = tokio::spawn(async move {
        loop {
            let notification = match notifications.recv().await {
                Ok(notification) => notification,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Panel fell behind, notifications skipped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(json) = encode_notification(&notification) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Receive panel events and queue them for the coordinator
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let Some(event) = decode_ui_event(&text) else {
                        continue;
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {} // Ignore binary, ping, pong
            }
        }
    });

    // If either task exits, abort the other. That drops this panel's event
    // sender; once the last panel is gone the coordinator loop ends and the
    // live session is cancelled.
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("Chat panel disconnected");
}

/// Parse one inbound frame. Unknown or malformed frames are logged and skipped.
pub fn decode_ui_event(text: &str) -> Option<UiEvent> {
    match serde_json::from_str::<UiEvent>(text) {
        Ok(event) => {
            debug!(?event, "Panel event");
            Some(event)
        }
        Err(e) => {
            warn!(error = %e, "Received invalid panel message");
            None
        }
    }
}

pub fn encode_notification(notification: &Notification) -> Option<String> {
    match serde_json::to_string(notification) {
        Ok(json) => Some(json),
        Err(e) => {
            error!(error = %e, "Failed to encode notification");
            None
        }
    }
}
