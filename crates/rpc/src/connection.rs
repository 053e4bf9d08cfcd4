//! Server-side client connection: read/write pumps and call dispatch.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use uploader_protocol::constants::{
    ERR_BAD_REQUEST, ERR_IO, Method, WS_MAX_MESSAGE_SIZE, WS_PING_PERIOD, WS_PONG_WAIT,
};
use uploader_protocol::{Message, parse_write_frame};

use crate::SEND_BUFFER_SIZE;
use crate::handler::Handler;

/// Handle for sending replies to a connected client.
///
/// Cloneable handle over an `mpsc::Sender`.
#[derive(Clone)]
pub struct Sender {
    tx: mpsc::Sender<WsMessage>,
}

impl Sender {
    /// Sends a protocol [`Message`] as JSON text.
    ///
    /// Waits for buffer space; returns `Err` only if the connection is gone.
    pub async fn send_msg(&self, msg: Message) -> Result<(), SendError> {
        let json = serde_json::to_string(&msg).map_err(|_| SendError)?;
        self.tx
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|_| SendError)
    }

    /// Sends a successful reply to the call with `id`.
    pub async fn reply<T: Serialize>(&self, id: &str, payload: &T) -> Result<(), SendError> {
        match Message::reply_to(id, payload) {
            Ok(msg) => self.send_msg(msg).await,
            Err(e) => {
                tracing::error!(%id, "failed to encode reply: {e}");
                self.send_error(id, ERR_IO, "failed to encode reply").await
            }
        }
    }

    /// Sends an error reply to the call with `id`.
    pub async fn send_error(&self, id: &str, code: i32, message: &str) -> Result<(), SendError> {
        self.send_msg(Message::error(id, code, message)).await
    }

    /// Returns `true` if the send channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Error returned when the connection is closed.
#[derive(Debug, thiserror::Error)]
#[error("send failed: connection closed")]
pub struct SendError;

/// Active connection to a client.
///
/// Owns the read/write pump tasks.
pub struct Connection {
    pub peer_addr: SocketAddr,
    sender: Sender,
    cancel: CancellationToken,
}

impl Connection {
    /// Returns a cloneable [`Sender`] for this connection.
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Signals the pumps to stop.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// Runs the read and write pumps for a WebSocket connection.
///
/// The pumps run as background tokio tasks and stop when the connection is
/// closed or the server cancel token is triggered.
pub fn spawn_connection<S, H>(
    ws_stream: S,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    server_cancel: CancellationToken,
) -> Connection
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error>
        + Send
        + 'static,
    H: Handler,
{
    let (tx, rx) = mpsc::channel::<WsMessage>(SEND_BUFFER_SIZE);
    let cancel = server_cancel.child_token();
    let sender = Sender { tx };

    let conn = Connection {
        peer_addr,
        sender: sender.clone(),
        cancel: cancel.clone(),
    };

    let (ws_sink, ws_stream) = ws_stream.split();

    tokio::spawn(write_pump(ws_sink, rx, cancel.clone()));

    let read_cancel = cancel;
    tokio::spawn(async move {
        read_pump(ws_stream, sender, Arc::clone(&handler), read_cancel.clone()).await;
        // When the read pump exits, stop the write pump too.
        read_cancel.cancel();
        handler.on_disconnected().await;
        tracing::info!(%peer_addr, "client disconnected");
    });

    conn
}

/// Write pump: drains the send channel and sends WS pings.
async fn write_pump<S>(mut sink: S, mut rx: mpsc::Receiver<WsMessage>, cancel: CancellationToken)
where
    S: futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Send + Unpin,
{
    let mut ping_interval = tokio::time::interval(WS_PING_PERIOD);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = rx.recv() => {
                match msg {
                    Some(ws_msg) => {
                        if let Err(e) = sink.send(ws_msg).await {
                            tracing::error!("write pump send error: {e}");
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = ping_interval.tick() => {
                if let Err(e) = sink.send(WsMessage::Ping(Vec::new().into())).await {
                    tracing::error!("write pump ping error: {e}");
                    break;
                }
            }
        }
    }

    // Best-effort close frame.
    let _ = sink.close().await;
}

/// Read pump: reads WS frames and dispatches each call on its own task.
async fn read_pump<S, H>(mut stream: S, sender: Sender, handler: Arc<H>, cancel: CancellationToken)
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Send
        + Unpin,
    H: Handler,
{
    let pong_deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(pong_deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut pong_deadline => {
                tracing::warn!("pong timeout, closing connection");
                break;
            }

            frame = stream.next() => {
                let ws_msg = match frame {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        tracing::error!("read pump error: {e}");
                        break;
                    }
                    None => break,
                };

                // Any inbound frame proves the peer is alive.
                pong_deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                match ws_msg {
                    WsMessage::Text(text) => {
                        if text.len() > WS_MAX_MESSAGE_SIZE {
                            tracing::error!("message exceeds max size ({} > {})", text.len(), WS_MAX_MESSAGE_SIZE);
                            continue;
                        }
                        let handler = Arc::clone(&handler);
                        let sender = sender.clone();
                        tokio::spawn(async move {
                            dispatch_text(handler.as_ref(), sender, text.as_str()).await;
                        });
                    }
                    WsMessage::Binary(data) => {
                        if data.len() > WS_MAX_MESSAGE_SIZE {
                            tracing::error!("binary message exceeds max size ({} > {})", data.len(), WS_MAX_MESSAGE_SIZE);
                            continue;
                        }
                        let handler = Arc::clone(&handler);
                        let sender = sender.clone();
                        tokio::spawn(async move {
                            dispatch_binary(handler.as_ref(), sender, &data).await;
                        });
                    }
                    WsMessage::Ping(data) => {
                        let _ = sender.tx.try_send(WsMessage::Pong(data));
                    }
                    WsMessage::Pong(_) => {}
                    WsMessage::Close(_) => {
                        tracing::debug!("received close frame");
                        break;
                    }
                    WsMessage::Frame(_) => {}
                }
            }
        }
    }
}

/// Dispatches a JSON call to the matching handler method.
pub(crate) async fn dispatch_text<H: Handler>(handler: &H, sender: Sender, text: &str) {
    let msg: Message = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("invalid message JSON: {e}");
            return;
        }
    };

    tracing::trace!(method = %msg.method, id = %msg.id, "dispatching call");

    match msg.method {
        Method::CreatePath => handler.on_create_path(sender, msg).await,
        Method::Create => handler.on_create(sender, msg).await,
        Method::Open => handler.on_open(sender, msg).await,
        Method::Stat => handler.on_stat(sender, msg).await,
        Method::Close => handler.on_close(sender, msg).await,
        Method::WriteAt | Method::Reply => {
            tracing::warn!(method = %msg.method, "method not callable as a text frame");
            let _ = sender
                .send_error(&msg.id, ERR_BAD_REQUEST, "method not callable as a text frame")
                .await;
        }
    }
}

/// Dispatches a binary `WriteAt` frame.
pub(crate) async fn dispatch_binary<H: Handler>(handler: &H, sender: Sender, frame: &[u8]) {
    match parse_write_frame(frame) {
        Ok((header, data)) => handler.on_write_at(sender, header, data).await,
        // Without a header there is no call id to reply to.
        Err(e) => tracing::error!("failed to parse binary frame: {e}"),
    }
}
