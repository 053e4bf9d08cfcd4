//! Upload client: remote transfer operations and the chunked upload
//! orchestrator that drives them.

pub mod api;
pub mod client;
pub mod uploader;

pub use api::{ApiFuture, TransferApi};
pub use client::Client;
pub use uploader::{UploadReport, Uploader};
pub use uploader_rpc::ConnectOptions;
pub use uploader_transfer::UploadProgress;

use uploader_protocol::constants::ERR_NO_SESSION;
use uploader_rpc::RpcError;
use uploader_transfer::TransferError;

/// Errors produced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(RpcError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The server answered with `result: false`.
    #[error("server rejected {0}")]
    Rejected(&'static str),

    /// The session id is unknown to the server (never created or retired).
    #[error("must open/create before writing")]
    NoSession,
}

impl From<RpcError> for ClientError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Remote {
                code: ERR_NO_SESSION,
                ..
            } => ClientError::NoSession,
            other => ClientError::Rpc(other),
        }
    }
}
