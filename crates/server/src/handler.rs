//! Transfer operations served to remote clients.
//!
//! Each method takes a decoded request and returns the reply payload or a
//! [`HandlerError`]; [`crate::service`] wires them to the transport.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use uploader_protocol::constants::{
    CREATE_TOKEN, ERR_BAD_REQUEST, ERR_IO, ERR_NO_SESSION, ERR_NOT_FOUND,
};
use uploader_protocol::{
    FileRequest, PathRequest, PathResponse, SessionRequest, SessionResponse, StatInfo, WriteHeader,
    WriteResponse,
};
use uploader_transfer::{TransferError, validate_relative_path};

use crate::session::{SessionFile, SessionStore};

/// Errors returned to the caller of a transfer operation.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("must open/create before writing")]
    NoSession,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("declared size {declared} does not match {actual} data bytes")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandlerError {
    /// Error code carried in the reply.
    pub fn code(&self) -> i32 {
        match self {
            HandlerError::NoSession => ERR_NO_SESSION,
            HandlerError::NotFound(_) => ERR_NOT_FOUND,
            HandlerError::InvalidPath(_) | HandlerError::SizeMismatch { .. } => ERR_BAD_REQUEST,
            HandlerError::Io(_) => ERR_IO,
        }
    }
}

impl From<TransferError> for HandlerError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Io(io) => HandlerError::Io(io),
            TransferError::InvalidPath(p) => HandlerError::InvalidPath(p),
            other => HandlerError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Serves transfer operations for files under one root directory.
#[derive(Debug)]
pub struct TransferHandler {
    root: PathBuf,
    store: SessionStore,
}

impl TransferHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            store: SessionStore::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Allocates a fresh upload directory under the root.
    ///
    /// Only [`CREATE_TOKEN`] is honored. Failures are reported through
    /// `result: false`.
    pub async fn create_path(&self, req: &PathRequest) -> PathResponse {
        let rejected = PathResponse {
            id: String::new(),
            result: false,
        };

        if req.request_token != CREATE_TOKEN {
            tracing::warn!(token = %req.request_token, "unsupported path request token");
            return rejected;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let dir = self.root.join(&id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::warn!(path = %dir.display(), "failed to create upload path: {e}");
            return rejected;
        }

        tracing::info!(path_id = %id, "upload path created");
        PathResponse { id, result: true }
    }

    /// Opens `root/path/filename` for writing and starts a session.
    ///
    /// An empty `path` yields `result: false` without touching the disk.
    /// Existing content is kept so a resumed upload only rewrites its blocks.
    pub async fn create(&self, req: &FileRequest) -> Result<SessionResponse, HandlerError> {
        if req.path.is_empty() {
            tracing::warn!(filename = %req.filename, "create without upload path");
            return Ok(SessionResponse::failed());
        }
        validate_relative_path(&req.path)?;
        validate_relative_path(&req.filename)?;

        let target = self.root.join(&req.path).join(&req.filename);
        let mut opts = OpenOptions::new();
        opts.write(true).create(true);
        #[cfg(unix)]
        opts.mode(uploader_protocol::constants::FILE_PERM);
        let file = opts.open(&target).await?;

        let session_id = self.store.add(SessionFile::new(file, target.clone())).await;
        tracing::info!(%session_id, path = %target.display(), "write session opened");
        Ok(SessionResponse::ok(session_id))
    }

    /// Opens `root/filename` read-only and starts a session.
    pub async fn open(&self, req: &FileRequest) -> Result<SessionResponse, HandlerError> {
        validate_relative_path(&req.filename)?;

        let target = self.root.join(&req.filename);
        let file = File::open(&target)
            .await
            .map_err(|e| not_found_or_io(e, &req.filename))?;

        let session_id = self.store.add(SessionFile::new(file, target.clone())).await;
        tracing::info!(%session_id, path = %target.display(), "read session opened");
        Ok(SessionResponse::ok(session_id))
    }

    /// Reports metadata of `root/filename`.
    pub async fn stat(&self, req: &FileRequest) -> Result<StatInfo, HandlerError> {
        validate_relative_path(&req.filename)?;

        let target = self.root.join(&req.filename);
        match uploader_transfer::probe(&target).await {
            Ok(info) => Ok(info),
            Err(TransferError::Io(e)) => Err(not_found_or_io(e, &req.filename)),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes one block into an open session.
    ///
    /// An `eof` write retires the session: the file is closed and the id
    /// stops resolving.
    pub async fn write_at(
        &self,
        header: &WriteHeader,
        data: &[u8],
    ) -> Result<WriteResponse, HandlerError> {
        let Some(session) = self.store.get(&header.session_id).await else {
            tracing::warn!(session_id = %header.session_id, "write to unknown session");
            return Err(HandlerError::NoSession);
        };

        if header.size != data.len() {
            return Err(HandlerError::SizeMismatch {
                declared: header.size,
                actual: data.len(),
            });
        }

        session.write_at(header.offset, data).await?;
        tracing::debug!(
            session_id = %header.session_id,
            offset = header.offset,
            size = data.len(),
            eof = header.eof,
            "block written"
        );

        if header.eof {
            self.store.delete(&header.session_id).await;
            tracing::info!(session_id = %header.session_id, "session complete");
        }

        Ok(WriteResponse {
            session_id: header.session_id.clone(),
            offset: header.offset,
            size: data.len(),
        })
    }

    /// Ends a session. Unknown or already retired ids still succeed.
    pub async fn close(&self, req: &SessionRequest) -> SessionResponse {
        if self.store.delete(&req.session_id).await {
            tracing::info!(session_id = %req.session_id, "session closed");
        }
        SessionResponse::ok(req.session_id.clone())
    }
}

fn not_found_or_io(e: std::io::Error, name: &str) -> HandlerError {
    if e.kind() == std::io::ErrorKind::NotFound {
        HandlerError::NotFound(name.to_string())
    } else {
        HandlerError::Io(e)
    }
}
