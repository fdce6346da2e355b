//! HTTP API server for the bridge

pub mod alexa;
mod auth;
pub mod health;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::bridge::Bridge;

/// Shared API state
pub struct ApiState {
    pub bridge: Bridge,
    pub api_key: Option<String>,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server from the bridge's own configuration
    #[must_use]
    pub fn new(bridge: Bridge) -> Self {
        let port = bridge.config().server.port;
        let api_key = bridge.config().server.api_key.clone();
        Self {
            state: Arc::new(ApiState { bridge, api_key }),
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.api_key.is_none() {
            tracing::warn!("API key not configured - allowing unauthenticated access");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// Build the full application router for the given state
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(alexa::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
}
