//! HTTP API server for the Parley gateway

pub mod health;
pub mod translate;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::capabilities::CapabilityTable;
use crate::session::SessionController;
use crate::synth::SpeechBackend;

/// Shared state for API handlers
pub struct ApiState {
    /// Runs one voice translation request end to end
    pub controller: Arc<SessionController>,

    /// Immutable capability registry
    pub table: Arc<CapabilityTable>,

    /// Synthesis chain, for capability reporting
    pub backends: Vec<Arc<dyn SpeechBackend>>,

    /// The microphone is a process-wide exclusive resource; concurrent
    /// requests take turns
    pub mic: Mutex<()>,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server over the shared handler state
    #[must_use]
    pub fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let router = Router::new()
            .merge(health::router())
            .merge(health::ready_router(Arc::clone(&self.state)))
            .merge(translate::router(Arc::clone(&self.state)));

        // CORS for browser frontends
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
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

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
