//! Handler trait for processing remote calls.
//!
//! Implementors provide the service logic while the server handles the
//! connection lifecycle, routing and the binary frame protocol.

use std::future::Future;
use std::pin::Pin;

use uploader_protocol::constants::ERR_NOT_IMPLEMENTED;
use uploader_protocol::{Message, WriteHeader};

use crate::connection::Sender;

/// A boxed future returned by handler methods.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Trait for handling remote calls.
///
/// Each method receives a `sender` for the reply and the parsed request.
/// Calls are dispatched on their own task, so methods may run concurrently.
///
/// Default implementations reply with "not implemented" so handlers only
/// need to override the methods they serve.
pub trait Handler: Send + Sync + 'static {
    /// Called for `RPC.CreatePath`.
    fn on_create_path(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    /// Called for `RPC.Create`.
    fn on_create(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    /// Called for `RPC.Open`.
    fn on_open(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    /// Called for `RPC.Stat`.
    fn on_stat(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    /// Called for `RPC.Close`.
    fn on_close(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    /// Called for a binary `RPC.WriteAt` frame.
    fn on_write_at(&self, sender: Sender, header: WriteHeader, data: Vec<u8>) -> HandlerFuture<'_> {
        let _ = data;
        Box::pin(async move {
            let _ = sender
                .send_error(&header.id, ERR_NOT_IMPLEMENTED, "not implemented")
                .await;
        })
    }

    /// Called once when a client connection ends.
    fn on_disconnected(&self) -> HandlerFuture<'_> {
        Box::pin(async {})
    }
}

fn not_implemented(sender: Sender, msg: Message) -> HandlerFuture<'static> {
    Box::pin(async move {
        let _ = sender
            .send_error(&msg.id, ERR_NOT_IMPLEMENTED, "not implemented")
            .await;
    })
}
