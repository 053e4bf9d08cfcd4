//! WebSocket RPC client.
//!
//! Requests are correlated with replies by id. [`RpcClient::call`] blocks
//! until the reply arrives or the call timeout elapses; [`RpcClient::go_write`]
//! returns as soon as the frame is queued and hands back a [`PendingCall`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;

use uploader_protocol::constants::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, Method, SERVICE_PATH, WS_MAX_MESSAGE_SIZE,
};
use uploader_protocol::{Message, SessionId, WriteHeader, encode_write_frame};

use crate::pumps::{self, PendingMap};
use crate::{RpcError, SEND_BUFFER_SIZE, token};

/// Connection tuning.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Builds the service URL for a `host:port` address.
///
/// Full `ws://` or `wss://` URLs are passed through unchanged.
pub fn service_url(addr: &str) -> String {
    if addr.starts_with("ws://") || addr.starts_with("wss://") {
        addr.to_string()
    } else {
        format!("ws://{addr}/{SERVICE_PATH}")
    }
}

/// A connected RPC client.
pub struct RpcClient {
    write_tx: mpsc::Sender<tungstenite::Message>,
    pending: PendingMap,
    call_timeout: Duration,
    cancel: CancellationToken,
    _read_handle: JoinHandle<()>,
    _write_handle: JoinHandle<()>,
    _ping_handle: JoinHandle<()>,
}

impl RpcClient {
    /// Dials `addr` and authenticates with `token`.
    pub async fn connect(addr: &str, token: &str, opts: ConnectOptions) -> Result<Self, RpcError> {
        let url = service_url(addr);
        let mut request = url.as_str().into_client_request()?;
        if !token.is_empty() {
            let value = HeaderValue::from_str(&token::bearer(token))
                .map_err(|_| RpcError::Protocol("token is not a valid header value".into()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);

        let dial = tokio_tungstenite::connect_async_with_config(request, Some(ws_config), false);
        let ws_stream = match tokio::time::timeout(opts.connect_timeout, dial).await {
            Err(_) => return Err(RpcError::Timeout),
            Ok(Err(tungstenite::Error::Http(resp)))
                if resp.status() == StatusCode::UNAUTHORIZED =>
            {
                return Err(RpcError::Unauthorized);
            }
            Ok(result) => result?.0,
        };
        tracing::debug!(%url, "connected");

        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(SEND_BUFFER_SIZE);
        let pending: PendingMap = Arc::new(Mutex::new(Default::default()));
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(pumps::write_pump(write, write_rx, cancel.clone()));
        let read_handle = tokio::spawn(pumps::read_pump(
            read,
            pending.clone(),
            write_tx.clone(),
            cancel.clone(),
        ));
        let ping_handle = tokio::spawn(pumps::ping_pump(write_tx.clone(), cancel.clone()));

        Ok(Self {
            write_tx,
            pending,
            call_timeout: opts.call_timeout,
            cancel,
            _read_handle: read_handle,
            _write_handle: write_handle,
            _ping_handle: ping_handle,
        })
    }

    /// Sends a JSON call and waits for its decoded reply.
    pub async fn call<Req, Resp>(&self, method: Method, payload: &Req) -> Result<Resp, RpcError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let msg = Message::request(method, payload)?;
        let json = serde_json::to_string(&msg)?;
        let call = self
            .submit(msg.id, tungstenite::Message::Text(json.into()))
            .await?;
        call.response().await
    }

    /// Queues a `WriteAt` frame without waiting for the reply.
    ///
    /// The returned [`PendingCall`] completes when the server has written
    /// the block (or failed to).
    pub async fn go_write(
        &self,
        session_id: &SessionId,
        offset: u64,
        data: &[u8],
        eof: bool,
    ) -> Result<PendingCall, RpcError> {
        let header = WriteHeader {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            offset,
            size: data.len(),
            eof,
        };
        let frame = encode_write_frame(&header, data)?;
        if frame.len() > WS_MAX_MESSAGE_SIZE {
            return Err(RpcError::Protocol(format!(
                "write frame of {} bytes exceeds the {WS_MAX_MESSAGE_SIZE} byte limit",
                frame.len()
            )));
        }
        self.submit(header.id, tungstenite::Message::Binary(frame.into()))
            .await
    }

    /// Registers a pending reply and queues the frame.
    async fn submit(
        &self,
        id: String,
        frame: tungstenite::Message,
    ) -> Result<PendingCall, RpcError> {
        if self.is_closed() {
            return Err(RpcError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if self.write_tx.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(RpcError::Closed);
        }

        Ok(PendingCall {
            id,
            rx,
            pending: self.pending.clone(),
            timeout: self.call_timeout,
        })
    }

    /// Returns `true` once the connection has gone away.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Closes the connection. Outstanding calls fail with [`RpcError::Closed`].
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An in-flight call.
pub struct PendingCall {
    id: String,
    rx: oneshot::Receiver<Message>,
    pending: PendingMap,
    timeout: Duration,
}

impl PendingCall {
    /// Correlation id of the call.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the reply envelope. Error replies become [`RpcError::Remote`].
    pub async fn wait(self) -> Result<Message, RpcError> {
        let result = tokio::time::timeout(self.timeout, self.rx).await;

        // Drop the entry on every exit path.
        self.pending.lock().await.remove(&self.id);

        match result {
            Ok(Ok(resp)) => match resp.error {
                Some(err) => Err(RpcError::Remote {
                    code: err.code,
                    message: err.message,
                }),
                None => Ok(resp),
            },
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => Err(RpcError::Timeout),
        }
    }

    /// Waits for the reply and decodes its payload.
    pub async fn response<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        let msg = self.wait().await?;
        msg.parse_payload()?
            .ok_or_else(|| RpcError::Protocol("reply carries no payload".into()))
    }
}
