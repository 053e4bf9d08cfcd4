//! WebSocket RPC server.
//!
//! Listens on a TCP address, authenticates the upgrade request against the
//! configured bearer token and serves any number of concurrent clients.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;

use uploader_protocol::constants::{SERVICE_PATH, WS_MAX_MESSAGE_SIZE};

use crate::RpcError;
use crate::connection::{self, Connection};
use crate::handler::Handler;
use crate::token;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Address to listen on (port 0 = OS-assigned).
    pub bind: SocketAddr,
    /// Expected bearer token. Empty disables authentication.
    pub token: String,
}

/// The RPC server.
///
/// Every inbound call is dispatched on its own task to the [`Handler`].
pub struct RpcServer<H: Handler> {
    config: RpcServerConfig,
    handler: Arc<H>,
    connections: Mutex<Vec<Connection>>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl<H: Handler> RpcServer<H> {
    /// Creates a new server with the given handler.
    pub fn new(config: RpcServerConfig, handler: H) -> Arc<Self> {
        Self::with_shared_handler(config, Arc::new(handler))
    }

    /// Creates a new server around an already shared handler.
    pub fn with_shared_handler(config: RpcServerConfig, handler: Arc<H>) -> Arc<Self> {
        Arc::new(Self {
            config,
            handler,
            connections: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Returns the handler.
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available once the listener is bound.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the number of live client connections.
    pub async fn connection_count(&self) -> usize {
        let mut conns = self.connections.lock().await;
        conns.retain(|c| c.sender().is_connected());
        conns.len()
    }

    /// Gracefully shuts down the server and all of its connections.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(self: &Arc<Self>) -> Result<(), RpcError> {
        let listener = TcpListener::bind(self.config.bind).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), RpcError> {
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        tracing::info!("rpc server listening on {local_addr}");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("server shutting down");
                    for conn in self.connections.lock().await.drain(..) {
                        conn.close();
                    }
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr).await {
                                    tracing::warn!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Upgrades a TCP stream to WebSocket and starts its pumps.
    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), RpcError> {
        let expected = self.config.token.clone();
        let check = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            if req.uri().path().trim_start_matches('/') != SERVICE_PATH {
                return Err(reject(StatusCode::NOT_FOUND, "unknown path"));
            }
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            if !token::authorize(header, &expected) {
                return Err(reject(StatusCode::UNAUTHORIZED, "invalid token"));
            }
            Ok(resp)
        };

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let ws_stream = accept_hdr_async_with_config(stream, check, Some(ws_config)).await?;
        tracing::info!(%peer_addr, "client connected");

        let conn = connection::spawn_connection(
            ws_stream,
            peer_addr,
            Arc::clone(&self.handler),
            self.cancel.clone(),
        );

        let mut conns = self.connections.lock().await;
        conns.retain(|c| c.sender().is_connected());
        conns.push(conn);
        Ok(())
    }
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some(reason.to_string()));
    *resp.status_mut() = status;
    resp
}
