// Liveness endpoint. Hosting platforms poll `GET /` to decide whether the
// process is still up; the bot itself never reads anything from here.

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub const LIVENESS_BODY: &str = "Ōkami bot is running!";

pub fn router() -> Router {
    Router::new().route("/", get(liveness))
}

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Liveness endpoint listening on {}", addr);
    axum::serve(listener, router()).await
}
