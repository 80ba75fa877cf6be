//! HTTP surface: relation index, diagram materialization and health

pub mod handlers;
pub mod router;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use codeviewer_core::{Materializer, RelationIndex};
use tokio::net::TcpListener;
use tracing::info;

pub use router::create_router;

/// Shared state behind every handler.
pub struct ServerState {
    pub materializer: Arc<Materializer>,
    pub index: Arc<RelationIndex>,
}

impl ServerState {
    pub fn new(materializer: Arc<Materializer>, index: Arc<RelationIndex>) -> Self {
        ServerState { materializer, index }
    }
}

/// Listen address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

pub struct CodeviewerServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl CodeviewerServer {
    pub fn new(materializer: Arc<Materializer>, index: Arc<RelationIndex>, config: ServerConfig) -> Self {
        CodeviewerServer {
            state: Arc::new(ServerState::new(materializer, index)),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let local: SocketAddr = listener.local_addr()?;
        info!("Codeviewer listening on http://{}", local);
        let router = create_router(self.state);
        axum::serve(listener, router).await?;
        Ok(())
    }
}
