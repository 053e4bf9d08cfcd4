use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Service name every remote method is registered under.
pub const SERVICE_PATH: &str = "RPC";

/// Size of one transfer block (1 MiB).
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// The only request token `CreatePath` honors.
pub const CREATE_TOKEN: &str = "CREATE";

/// Permission bits for files created by `Create` (before umask).
pub const FILE_PERM: u32 = 0o666;

/// Maximum WebSocket message size in bytes (16 MB).
///
/// Must hold one full block plus its binary header.
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Largest block a client may send, leaving room for the binary header.
pub const MAX_BLOCK_SIZE: usize = WS_MAX_MESSAGE_SIZE - 64 * 1024;

/// How often the server pings an idle connection.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(5);

/// Time to wait for a pong (or any incoming frame) before a connection
/// is considered dead.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// Default bound on connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a single remote call.
///
/// Block writes include disk I/O on the server, so this is generous.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

// Error codes carried in `RpcErrorBody::code`.
pub const ERR_BAD_REQUEST: i32 = 400;
pub const ERR_NOT_FOUND: i32 = 404;
/// Protocol misuse: a write or close addressed a session that was never
/// created (or is already retired).
pub const ERR_NO_SESSION: i32 = 409;
pub const ERR_IO: i32 = 500;
pub const ERR_NOT_IMPLEMENTED: i32 = 501;

/// Remote method identifier.
///
/// Serialized as `"<SERVICE_PATH>.<Method>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "RPC.CreatePath")]
    CreatePath,
    #[serde(rename = "RPC.Create")]
    Create,
    #[serde(rename = "RPC.Open")]
    Open,
    #[serde(rename = "RPC.Stat")]
    Stat,
    #[serde(rename = "RPC.WriteAt")]
    WriteAt,
    #[serde(rename = "RPC.Close")]
    Close,
    /// Envelope type for replies; never dispatched to a handler.
    #[serde(rename = "RPC.Reply")]
    Reply,
}

impl Method {
    /// Bare method name without the service prefix.
    pub fn name(self) -> &'static str {
        match self {
            Method::CreatePath => "CreatePath",
            Method::Create => "Create",
            Method::Open => "Open",
            Method::Stat => "Stat",
            Method::WriteAt => "WriteAt",
            Method::Close => "Close",
            Method::Reply => "Reply",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SERVICE_PATH}.{}", self.name())
    }
}
