//! Request/response transport over WebSocket.
//!
//! JSON calls travel as text frames in a [`Message`](uploader_protocol::Message)
//! envelope and are correlated by id; block writes travel as binary frames.
//! Connections authenticate with a bearer token during the WebSocket upgrade.
//!
//! The server side dispatches every inbound call on its own task to a
//! [`Handler`]. The client side offers a synchronous [`RpcClient::call`] and
//! an asynchronous [`RpcClient::go_write`] whose [`PendingCall`] is the
//! completion signal.

pub mod client;
pub mod connection;
pub mod error;
pub mod handler;
mod pumps;
pub mod server;
pub mod token;

pub use client::{ConnectOptions, PendingCall, RpcClient};
pub use connection::{Connection, SendError, Sender};
pub use error::RpcError;
pub use handler::{Handler, HandlerFuture};
pub use server::{RpcServer, RpcServerConfig};
pub use token::{generate_token, validate_token};

/// Outbound frame buffer per connection.
pub const SEND_BUFFER_SIZE: usize = 256;
