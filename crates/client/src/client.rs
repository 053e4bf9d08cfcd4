//! Network client for the upload server.

use uploader_protocol::constants::{CREATE_TOKEN, Method};
use uploader_protocol::{
    FileRequest, PathRequest, PathResponse, SessionId, SessionRequest, SessionResponse, StatInfo,
    WriteResponse,
};
use uploader_rpc::{ConnectOptions, RpcClient};

use crate::ClientError;
use crate::api::{ApiFuture, TransferApi};

/// A connection to an upload server.
pub struct Client {
    rpc: RpcClient,
}

impl Client {
    /// Connects to `addr` (`host:port` or a full `ws://` URL).
    pub async fn dial(addr: &str, token: &str, opts: ConnectOptions) -> Result<Self, ClientError> {
        let rpc = RpcClient::connect(addr, token, opts).await?;
        tracing::info!(%addr, "connected to upload server");
        Ok(Self { rpc })
    }

    /// Underlying transport.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Asks the server for a fresh upload directory.
    pub async fn create_path(&self) -> Result<String, ClientError> {
        let resp: PathResponse = self
            .rpc
            .call(
                Method::CreatePath,
                &PathRequest {
                    request_token: CREATE_TOKEN.into(),
                },
            )
            .await?;
        if !resp.result {
            return Err(ClientError::Rejected("path creation"));
        }
        Ok(resp.id)
    }

    /// Opens `filename` for writing in the upload directory `path_id`.
    pub async fn create(&self, filename: &str, path_id: &str) -> Result<SessionId, ClientError> {
        let resp: SessionResponse = self
            .rpc
            .call(
                Method::Create,
                &FileRequest {
                    filename: filename.into(),
                    path: path_id.into(),
                },
            )
            .await?;
        if !resp.result {
            return Err(ClientError::Rejected("file creation"));
        }
        Ok(resp.session_id)
    }

    /// Opens an existing server file for reading.
    pub async fn open(&self, filename: &str) -> Result<SessionId, ClientError> {
        let resp: SessionResponse = self
            .rpc
            .call(
                Method::Open,
                &FileRequest {
                    filename: filename.into(),
                    path: String::new(),
                },
            )
            .await?;
        if !resp.result {
            return Err(ClientError::Rejected("file open"));
        }
        Ok(resp.session_id)
    }

    /// Reads metadata of a server file, relative to the server root.
    pub async fn stat(&self, filename: &str) -> Result<StatInfo, ClientError> {
        Ok(self
            .rpc
            .call(
                Method::Stat,
                &FileRequest {
                    filename: filename.into(),
                    path: String::new(),
                },
            )
            .await?)
    }

    /// Sends one block and waits for the server to write it.
    pub async fn write_at(
        &self,
        session_id: &SessionId,
        offset: u64,
        data: &[u8],
        eof: bool,
    ) -> Result<WriteResponse, ClientError> {
        let call = self.rpc.go_write(session_id, offset, data, eof).await?;
        Ok(call.response().await?)
    }

    /// Ends a session on the server.
    pub async fn close_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        let _: SessionResponse = self
            .rpc
            .call(
                Method::Close,
                &SessionRequest {
                    session_id: session_id.clone(),
                },
            )
            .await?;
        Ok(())
    }

    /// Drops the connection.
    pub fn close(&self) {
        self.rpc.close();
    }
}

impl TransferApi for Client {
    fn create_path(&self) -> ApiFuture<'_, String> {
        Box::pin(Client::create_path(self))
    }

    fn create<'a>(&'a self, filename: &'a str, path_id: &'a str) -> ApiFuture<'a, SessionId> {
        Box::pin(Client::create(self, filename, path_id))
    }

    fn write_at<'a>(
        &'a self,
        session_id: &'a SessionId,
        offset: u64,
        data: &'a [u8],
        eof: bool,
    ) -> ApiFuture<'a, WriteResponse> {
        Box::pin(Client::write_at(self, session_id, offset, data, eof))
    }

    fn close_session<'a>(&'a self, session_id: &'a SessionId) -> ApiFuture<'a, ()> {
        Box::pin(Client::close_session(self, session_id))
    }
}
