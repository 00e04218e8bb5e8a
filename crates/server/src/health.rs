use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{error, info};

pub const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub bot_version: &'static str,
}

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

pub async fn spawn(bind_address: &str, port: u16) -> std::io::Result<SocketAddr> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let local_address = listener.local_addr()?;

    info!(
        event_name = "system.health.start",
        bind_address = %local_address,
        "serving health check requests"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router()).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(local_address)
}

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { bot_version: BOT_VERSION }))
}
