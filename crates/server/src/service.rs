//! Transport glue: decodes calls, runs the [`TransferHandler`] and replies.

use serde::Serialize;
use serde::de::DeserializeOwned;

use uploader_protocol::constants::ERR_BAD_REQUEST;
use uploader_protocol::{FileRequest, Message, PathRequest, SessionRequest, WriteHeader};
use uploader_rpc::{Handler, HandlerFuture, Sender};

use crate::handler::{HandlerError, TransferHandler};

impl Handler for TransferHandler {
    fn on_create_path(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = parse::<PathRequest>(&sender, &msg).await else {
                return;
            };
            let resp = self.create_path(&req).await;
            let _ = sender.reply(&msg.id, &resp).await;
        })
    }

    fn on_create(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = parse::<FileRequest>(&sender, &msg).await else {
                return;
            };
            respond(&sender, &msg.id, self.create(&req).await).await;
        })
    }

    fn on_open(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = parse::<FileRequest>(&sender, &msg).await else {
                return;
            };
            respond(&sender, &msg.id, self.open(&req).await).await;
        })
    }

    fn on_stat(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = parse::<FileRequest>(&sender, &msg).await else {
                return;
            };
            respond(&sender, &msg.id, self.stat(&req).await).await;
        })
    }

    fn on_close(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = parse::<SessionRequest>(&sender, &msg).await else {
                return;
            };
            let resp = self.close(&req).await;
            let _ = sender.reply(&msg.id, &resp).await;
        })
    }

    fn on_write_at(&self, sender: Sender, header: WriteHeader, data: Vec<u8>) -> HandlerFuture<'_> {
        Box::pin(async move {
            respond(&sender, &header.id, self.write_at(&header, &data).await).await;
        })
    }

    /// Sessions are not tied to a connection and outlive it: a session left
    /// open by a failed upload keeps its file handle until an eof write or
    /// a Close arrives on any connection, or the server exits.
    fn on_disconnected(&self) -> HandlerFuture<'_> {
        Box::pin(async move {
            let live = self.store().count().await;
            tracing::debug!(live_sessions = live, "client gone");
        })
    }
}

/// Decodes the payload, replying 400 when it is missing or malformed.
async fn parse<T: DeserializeOwned>(sender: &Sender, msg: &Message) -> Option<T> {
    match msg.parse_payload::<T>() {
        Ok(Some(req)) => Some(req),
        Ok(None) => {
            let _ = sender
                .send_error(&msg.id, ERR_BAD_REQUEST, "missing payload")
                .await;
            None
        }
        Err(e) => {
            let _ = sender
                .send_error(&msg.id, ERR_BAD_REQUEST, &format!("invalid payload: {e}"))
                .await;
            None
        }
    }
}

async fn respond<T: Serialize>(sender: &Sender, id: &str, result: Result<T, HandlerError>) {
    let sent = match result {
        Ok(resp) => sender.reply(id, &resp).await,
        Err(e) => {
            tracing::warn!(%id, code = e.code(), "call failed: {e}");
            sender.send_error(id, e.code(), &e.to_string()).await
        }
    };
    if sent.is_err() {
        tracing::debug!(%id, "reply dropped, client disconnected");
    }
}
