//! rentsync development server
//!
//! Serves the rental resources (`vehicles`, `reservations`, `users`,
//! `messages`, `locations`) from memory. Data is lost on restart.
//!
//! # Configuration
//!
//! Environment variables:
//! - `RENTSYNC_PORT`: Port to listen on (default: 8080)
//! - `RUST_LOG`: Log filter (default: `rentsync=info,tower_http=info`)

use rentsync::{router, ResourceStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8080;

fn port_from_env() -> u16 {
    std::env::var("RENTSYNC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentsync=info,rentsync_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = router(Arc::new(ResourceStore::new())).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port_from_env()));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("rentsync server listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
