//! Error types for the transport.

use tokio_tungstenite::tungstenite;
use uploader_protocol::FrameError;

/// Errors produced by the RPC transport.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad frame: {0}")]
    Frame(#[from] FrameError),

    #[error("call timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("server rejected the auth token")]
    Unauthorized,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },
}
