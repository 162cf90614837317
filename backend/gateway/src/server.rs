//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use qchat_core::Model;
use qchat_session::ChatContext;

use crate::panel_hub::PanelHub;
use crate::{health_api, ws_server};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    /// The one coordinator every panel talks to.
    pub hub: Arc<PanelHub>,
    /// Catalog fetched once at startup.
    pub models: Arc<Vec<Model>>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(context: ChatContext, models: Vec<Model>) -> Self {
        Self {
            hub: Arc::new(PanelHub::new(context)),
            models: Arc::new(models),
            started_at: Instant::now(),
        }
    }
}

async fn list_models(State(state): State<GatewayState>) -> Json<Vec<Model>> {
    Json(state.models.as_ref().clone())
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/health", get(health_api::get_health))
        .route("/api/models", get(list_models))
        .route("/api/ws", get(ws_server::ws_handler))
        .with_state(state)
}

/// Starts the main Axum HTTP server for the gateway.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    serve(listener, state).await
}

/// Serve on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Gateway server failed")
}
