//! QR code HTTP service.
//!
//! Turns text into a PNG QR code on demand.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ request ID → trace → metrics
//!                        │
//!         ┌──────────────┼──────────────────────────┐
//!         ▼              ▼                          ▼
//!   GET /health       GET /qr, POST /qr         anything else
//!   GET /                │                          │
//!         │         API key gate                404 NOT_FOUND
//!         │              │
//!         │         rate limiter ◀── sweeper (expired windows)
//!         │              │
//!         │         validation
//!         │              │
//!         │         renderer (blocking pool, deadline)
//!         ▼              ▼
//!       JSON        image/png  ── or ──▶ error normalizer → JSON error
//! ```

use std::net::SocketAddr;

use tokio::net::TcpListener;

use qr_code_api::config;
use qr_code_api::observability::{logging, metrics};
use qr_code_api::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::resolve();
    logging::init(&config.observability);

    tracing::info!("qr-code-api v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %address,
                error = %e,
                "Failed to parse metrics address, metrics export disabled"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let _signals = shutdown.trigger_on_signal();

    HttpServer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
