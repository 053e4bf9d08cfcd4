//! Live file sessions keyed by id.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use uploader_protocol::SessionId;

/// An open file owned by one session.
///
/// The handle is taken out on close, so it is released exactly once and any
/// later write fails instead of touching a stale descriptor.
#[derive(Debug)]
pub struct SessionFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl SessionFile {
    pub fn new(file: File, path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(Some(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `data` at `offset` and flushes it to the file.
    pub async fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        let mut guard = self.file.lock().await;
        let file = guard.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "session file is closed")
        })?;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await
    }

    /// Releases the handle. Closing twice is a no-op.
    pub async fn close(&self) -> std::io::Result<()> {
        let Some(mut file) = self.file.lock().await.take() else {
            return Ok(());
        };
        file.flush().await
    }

    pub async fn is_closed(&self) -> bool {
        self.file.lock().await.is_none()
    }
}

/// All live sessions of a server process.
///
/// Every operation holds the store lock, so add/get/delete never interleave.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Arc<SessionFile>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and returns its fresh id.
    pub async fn add(&self, file: SessionFile) -> SessionId {
        let mut sessions = self.sessions.lock().await;
        let mut id = SessionId::generate();
        while sessions.contains_key(&id) {
            id = SessionId::generate();
        }
        sessions.insert(id.clone(), Arc::new(file));
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<SessionFile>> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Removes the session and closes its file.
    ///
    /// Returns `false` if the id was unknown. Close errors are logged, not
    /// returned.
    pub async fn delete(&self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.lock().await.remove(id) else {
            return false;
        };
        if let Err(e) = session.close().await {
            tracing::warn!(session_id = %id, path = %session.path().display(), "close failed: {e}");
        }
        true
    }

    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn temp_session(dir: &Path, name: &str) -> SessionFile {
        let path = dir.join(name);
        let file = File::create(&path).await.unwrap();
        SessionFile::new(file, path)
    }

    #[tokio::test]
    async fn add_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new();

        let id = store.add(temp_session(dir.path(), "a").await).await;
        assert!(!id.is_empty());
        assert_eq!(store.count().await, 1);

        let session = store.get(&id).await.unwrap();
        assert_eq!(session.path(), dir.path().join("a"));

        assert!(store.delete(&id).await);
        assert!(session.is_closed().await);
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new();
        let id = store.add(temp_session(dir.path(), "a").await).await;

        assert!(store.delete(&id).await);
        assert!(!store.delete(&id).await);
        assert!(!store.delete(&SessionId::from("never-issued")).await);
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let store = SessionStore::new();
        assert!(store.get(&SessionId::from("nope")).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_adds_yield_unique_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::new());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            let session = temp_session(dir.path(), &format!("f{i}")).await;
            tasks.push(tokio::spawn(async move { store.add(session).await }));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(store.count().await, 32);
    }

    #[tokio::test]
    async fn write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = temp_session(dir.path(), "a").await;

        session.write_at(0, b"abc").await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();

        let err = session.write_at(3, b"def").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn out_of_order_writes_land_at_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let session = temp_session(dir.path(), "a").await;

        session.write_at(4, b"tail").await.unwrap();
        session.write_at(0, b"head").await.unwrap();
        session.close().await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"headtail");
    }
}
