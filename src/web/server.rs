//! Keep-alive server implementation

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::info;

use crate::config::RoleNames;
use crate::managers::SharedVerificationManager;

#[derive(Clone)]
struct AppState {
    verification_manager: SharedVerificationManager,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    pending: usize,
    roles: RoleNames,
}

fn router(verification_manager: SharedVerificationManager) -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(health))
        .with_state(AppState {
            verification_manager,
        })
}

/// Serve the keep-alive endpoint until the process exits
pub async fn start_keep_alive_server(
    port: u16,
    verification_manager: SharedVerificationManager,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Keep-alive server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(verification_manager)).await?;
    Ok(())
}

async fn alive() -> &'static str {
    "Bot is alive!"
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = &state.verification_manager;
    Json(HealthResponse {
        status: "ok",
        pending: manager.store().len(),
        roles: manager.roles().clone(),
    })
}
