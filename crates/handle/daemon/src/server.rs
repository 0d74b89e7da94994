//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use handle_engine::{HandleEngine, HandleService, InMemoryHandleService};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Handle daemon server
pub struct Server {
    config: DaemonConfig,
    engine: Arc<HandleEngine>,
}

impl Server {
    /// Create a new server backed by the in-memory identifier service
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        Self::with_service(config, Arc::new(InMemoryHandleService::new()))
    }

    /// Create a new server backed by the given identifier service
    pub fn with_service(
        config: DaemonConfig,
        service: Arc<dyn HandleService>,
    ) -> DaemonResult<Self> {
        let engine = Arc::new(build_engine(&config, service)?);
        Ok(Self { config, engine })
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.engine.clone());
        let app = create_router(state, self.config.server.max_body_size);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Handle daemon listening on {}", addr);
        tracing::info!(
            admin = %self.config.admin.handle,
            key_index = self.config.admin.key_index,
            generator = %self.config.generator.default,
            "Administrative identity configured"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Handle daemon shutting down");
        Ok(())
    }
}

/// Build the engine described by the configuration
pub fn build_engine(
    config: &DaemonConfig,
    service: Arc<dyn HandleService>,
) -> DaemonResult<HandleEngine> {
    let generators = config.generator.registry();
    generators
        .resolve(None)
        .map_err(|e| DaemonError::Config(format!("generator.default: {}", e)))?;

    Ok(HandleEngine::new(service, config.admin.policy())
        .with_generators(generators)
        .with_max_generation_attempts(config.generator.max_attempts))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
