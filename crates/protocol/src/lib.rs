//! Wire protocol shared by the uploader client and server.
//!
//! JSON requests and replies travel in a [`Message`] envelope as WebSocket
//! text frames; block writes travel as binary frames (see [`binary`]).

pub mod binary;
pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use binary::{FrameError, WriteHeader, encode_write_frame, parse_write_frame};
pub use constants::Method;
pub use envelope::{Message, RpcErrorBody};
pub use messages::{
    FileRequest, PathRequest, PathResponse, SessionRequest, SessionResponse, WriteResponse,
};
pub use types::{FileKind, SessionId, StatInfo};
