//! Upload server: keeps write sessions for files under a root directory and
//! serves the transfer operations over the RPC transport.

pub mod handler;
mod service;
pub mod session;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use uploader_rpc::{RpcError, RpcServer, RpcServerConfig};

pub use handler::{HandlerError, TransferHandler};
pub use session::{SessionFile, SessionStore};

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Rpc(#[from] RpcError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory all upload paths are created under.
    pub root: PathBuf,
    /// Bearer token clients must present. Empty disables authentication.
    pub token: String,
}

/// The upload server.
pub struct UploadServer {
    rpc: Arc<RpcServer<TransferHandler>>,
}

impl UploadServer {
    /// Creates the root directory and prepares the server.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        tokio::fs::create_dir_all(&config.root).await?;
        tracing::info!(root = %config.root.display(), "serving uploads");

        let handler = Arc::new(TransferHandler::new(config.root));
        let rpc = RpcServer::with_shared_handler(
            RpcServerConfig {
                bind: config.bind,
                token: config.token,
            },
            handler,
        );
        Ok(Self { rpc })
    }

    pub fn handler(&self) -> &Arc<TransferHandler> {
        self.rpc.handler()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.rpc.local_addr().await
    }

    /// Binds the configured address and serves until [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<(), ServerError> {
        Ok(self.rpc.run().await?)
    }

    /// Serves on an already bound listener until [`shutdown`](Self::shutdown).
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        Ok(self.rpc.serve(listener).await?)
    }

    pub fn shutdown(&self) {
        self.rpc.shutdown();
    }
}
