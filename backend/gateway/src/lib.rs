//! qchat Gateway HTTP API Server
//!
//! Serves chat panels over WebSocket plus health and model catalog routes.
//! All panels share one coordinator.

pub mod health_api;
pub mod panel_hub;
pub mod server;
pub mod ws_server;

pub use server::{router, start_server, GatewayState};
