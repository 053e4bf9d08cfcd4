//! The remote operations an upload needs.

use std::future::Future;
use std::pin::Pin;

use uploader_protocol::{SessionId, WriteResponse};

use crate::ClientError;

/// A boxed future returned by [`TransferApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// Remote side of an upload.
///
/// [`Client`](crate::Client) implements it over the network; tests drive the
/// [`Uploader`](crate::Uploader) through in-memory implementations.
pub trait TransferApi: Send + Sync {
    /// Allocates a fresh upload directory and returns its id.
    fn create_path(&self) -> ApiFuture<'_, String>;

    /// Opens `filename` for writing inside the upload directory `path_id`.
    fn create<'a>(&'a self, filename: &'a str, path_id: &'a str) -> ApiFuture<'a, SessionId>;

    /// Writes one block and waits for its acknowledgement.
    fn write_at<'a>(
        &'a self,
        session_id: &'a SessionId,
        offset: u64,
        data: &'a [u8],
        eof: bool,
    ) -> ApiFuture<'a, WriteResponse>;

    /// Ends the session.
    fn close_session<'a>(&'a self, session_id: &'a SessionId) -> ApiFuture<'a, ()>;
}
