//! CAPI Relay - server-side Conversions API intake
//!
//! Browsers post conversion events here instead of to the ad network. The
//! relay validates them, hashes the PII, answers `202 Accepted` and
//! forwards each event to the Graph API in the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐      ┌──────────────────────────┐      ┌─────────────┐
//! │   Browser   │──────│   CAPI Relay             │──────│  Graph API  │
//! │             │ HTTP │                          │ HTTP │  /events    │
//! └─────────────┘      │  1. Validate body        │      └─────────────┘
//!                      │  2. Capture ip / agent   │
//!                      │  3. Answer 202           │
//!                      │  4. Hash + forward       │
//!                      └──────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```text
//! POST http://relay:3002/api/v1/analytics/track
//! Content-Type: application/json
//!
//! {"eventName": "Lead", "eventId": "abc123", "eventSourceUrl": "https://x.test/",
//!  "userData": {"email": "a@b.com"}}
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod forwarder;
pub mod logging;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

pub use config::{CapiConfig, RelayArgs, RelayConfig};
pub use dispatch::{DetachedTask, Dispatcher, InlineDispatcher, TokioDispatcher};
pub use forwarder::{CapiForwarder, EventForwarder};

/// Shared handler state
pub struct AppState {
    pub forwarder: Arc<dyn EventForwarder>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

/// CAPI Relay server
pub struct RelayServer {
    state: Arc<AppState>,
    config: RelayConfig,
}

impl RelayServer {
    /// Create a server around an explicit forwarder and dispatcher
    pub fn new(
        config: RelayConfig,
        forwarder: Arc<dyn EventForwarder>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                forwarder,
                dispatcher,
            }),
            config,
        }
    }

    /// Create a server that forwards to the configured Graph API and spawns
    /// each forward onto the runtime
    pub fn from_config(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let forwarder = CapiForwarder::new(config.capi.clone())?;
        Ok(Self::new(config, Arc::new(forwarder), Arc::new(TokioDispatcher)))
    }

    /// Build the router
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.state), &self.config.allowed_origins)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.config.port))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let addr = self.addr();

        tracing::info!("CAPI Relay listening on http://{}", addr);
        tracing::info!("Endpoints:");
        tracing::info!("  POST {}/track - Receive a conversion event", routes::ANALYTICS_PREFIX);
        tracing::info!("  GET  {}/ping  - Liveness check", routes::ANALYTICS_PREFIX);
        tracing::info!(dispatcher = self.state.dispatcher.name(), "Forwarding in background");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("CAPI Relay stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
