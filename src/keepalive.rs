//! Liveness endpoint for external uptime monitors.
//!
//! Bound during startup so a taken port aborts the process, then served from
//! its own task; it shares nothing with the bot.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const BODY: &str = "LearnauraBot is running!";

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

async fn alive() -> (StatusCode, &'static str) {
    (StatusCode::OK, BODY)
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind keep-alive server on {}", addr))
}

pub fn spawn(listener: TcpListener) -> JoinHandle<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "keep-alive server listening");
    }
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            error!(error = %e, "keep-alive server error");
        }
    })
}
