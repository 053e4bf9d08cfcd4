//! Chunked upload orchestration.
//!
//! An upload runs in four phases:
//!
//! 1. **Plan**: probe the local file and split it into blocks. Directories,
//!    unreadable files and oversized blocks fail here, before any remote call.
//! 2. **Begin**: allocate an upload directory (unless one is given) and open
//!    a write session for the file.
//! 3. **Send**: write blocks `start..block_count` strictly in order, each
//!    acknowledged before the next is read. The last block carries `eof`.
//! 4. **Finish**: close the session.
//!
//! The first failure aborts the upload. Nothing is retried and a session
//! left open by a failed block is not closed.

use std::path::Path;

use tokio::sync::mpsc;

use uploader_protocol::SessionId;
use uploader_transfer::{
    BLOCK_SIZE, BlockReader, ProgressCadence, TransferError, UploadProgress, probe,
};

use crate::ClientError;
use crate::api::TransferApi;

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub path_id: String,
    pub session_id: SessionId,
    /// Blocks written by this run.
    pub blocks_sent: u64,
    /// Bytes written by this run.
    pub bytes_sent: u64,
}

/// Drives one file through a [`TransferApi`].
pub struct Uploader<'a, A: TransferApi> {
    api: &'a A,
    block_size: usize,
    progress: Option<mpsc::Sender<UploadProgress>>,
}

impl<'a, A: TransferApi> Uploader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            block_size: BLOCK_SIZE,
            progress: None,
        }
    }

    /// Overrides the block size (0 keeps the default).
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = if block_size == 0 { BLOCK_SIZE } else { block_size };
        self
    }

    /// Reports progress on `tx`. Reports are dropped when the channel is full.
    pub fn with_progress(mut self, tx: mpsc::Sender<UploadProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Uploads the whole file.
    pub async fn upload(
        &self,
        path: &Path,
        path_id: Option<&str>,
    ) -> Result<UploadReport, ClientError> {
        self.upload_at(path, path_id, 0).await
    }

    /// Uploads blocks `start..` of the file, leaving earlier blocks to a
    /// previous run.
    ///
    /// Without `path_id` a fresh upload directory is allocated.
    pub async fn upload_at(
        &self,
        path: &Path,
        path_id: Option<&str>,
        start: u64,
    ) -> Result<UploadReport, ClientError> {
        // Plan
        let info = probe(path).await?;
        if info.is_dir() {
            return Err(TransferError::IsDirectory(path.display().to_string()).into());
        }
        let mut reader = BlockReader::open(path, self.block_size).await?;
        let plan = *reader.plan();
        plan.validate_start(start)?;
        let block_count = plan.block_count();

        // Begin
        let path_id = match path_id {
            Some(id) => id.to_string(),
            None => self.api.create_path().await?,
        };
        let session_id = self.api.create(&info.name, &path_id).await?;
        tracing::info!(
            file = %info.name,
            size = info.size,
            blocks = block_count,
            start,
            %session_id,
            "upload started"
        );

        // Send
        let total = block_count - start;
        let cadence = ProgressCadence::new(total);
        let mut blocks_sent = 0u64;
        let mut bytes_sent = 0u64;

        for index in start..block_count {
            let block = reader.read_block(index).await?;
            self.api
                .write_at(&session_id, block.offset, &block.data, block.eof)
                .await?;

            blocks_sent += 1;
            bytes_sent += block.size() as u64;

            if cadence.should_report(blocks_sent) {
                self.report(UploadProgress {
                    file: info.name.clone(),
                    blocks_done: blocks_sent,
                    blocks_total: total,
                    bytes_sent,
                });
            }
        }

        // Finish
        self.api.close_session(&session_id).await?;
        tracing::info!(file = %info.name, blocks_sent, bytes_sent, "upload complete");

        Ok(UploadReport {
            path_id,
            session_id,
            blocks_sent,
            bytes_sent,
        })
    }

    fn report(&self, progress: UploadProgress) {
        tracing::debug!(
            file = %progress.file,
            done = progress.blocks_done,
            total = progress.blocks_total,
            "upload progress"
        );
        if let Some(tx) = &self.progress {
            let _ = tx.try_send(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use uploader_protocol::WriteResponse;
    use uploader_rpc::RpcError;

    use crate::api::ApiFuture;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        CreatePath,
        Create { filename: String, path_id: String },
        WriteAt { offset: u64, size: usize, eof: bool },
        Close,
    }

    /// Records every call; optionally fails the write at `fail_write`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail_write: Option<usize>,
        reject_create: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn writes(&self) -> Vec<(u64, usize, bool)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::WriteAt { offset, size, eof } => Some((offset, size, eof)),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: Call) -> usize {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        }
    }

    impl TransferApi for Recorder {
        fn create_path(&self) -> ApiFuture<'_, String> {
            self.record(Call::CreatePath);
            Box::pin(async { Ok::<_, ClientError>("path-1".to_string()) })
        }

        fn create<'a>(&'a self, filename: &'a str, path_id: &'a str) -> ApiFuture<'a, SessionId> {
            self.record(Call::Create {
                filename: filename.into(),
                path_id: path_id.into(),
            });
            let reject = self.reject_create;
            Box::pin(async move {
                if reject {
                    Err(ClientError::Rejected("file creation"))
                } else {
                    Ok(SessionId::from("session-1"))
                }
            })
        }

        fn write_at<'a>(
            &'a self,
            session_id: &'a SessionId,
            offset: u64,
            data: &'a [u8],
            eof: bool,
        ) -> ApiFuture<'a, WriteResponse> {
            self.record(Call::WriteAt {
                offset,
                size: data.len(),
                eof,
            });
            let nth = self.writes().len();
            let fail = self.fail_write == Some(nth);
            Box::pin(async move {
                if fail {
                    return Err(ClientError::from(RpcError::Timeout));
                }
                Ok(WriteResponse {
                    session_id: session_id.clone(),
                    offset,
                    size: data.len(),
                })
            })
        }

        fn close_session<'a>(&'a self, _session_id: &'a SessionId) -> ApiFuture<'a, ()> {
            self.record(Call::Close);
            Box::pin(async { Ok::<_, ClientError>(()) })
        }
    }

    const MIB: usize = 1024 * 1024;

    fn local_file(len: usize) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, vec![0xA5u8; len]).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn two_and_a_half_mib_in_three_blocks() {
        let (_dir, path) = local_file(2 * MIB + MIB / 2);
        let api = Recorder::default();

        let report = Uploader::new(&api).upload(&path, None).await.unwrap();

        assert_eq!(
            api.writes(),
            vec![
                (0, 1_048_576, false),
                (1_048_576, 1_048_576, false),
                (2_097_152, 524_288, true),
            ]
        );
        let calls = api.calls();
        assert_eq!(calls.first(), Some(&Call::CreatePath));
        assert_eq!(
            calls[1],
            Call::Create {
                filename: "data.bin".into(),
                path_id: "path-1".into(),
            }
        );
        assert_eq!(calls.last(), Some(&Call::Close));
        assert_eq!(
            report,
            UploadReport {
                path_id: "path-1".into(),
                session_id: SessionId::from("session-1"),
                blocks_sent: 3,
                bytes_sent: (2 * MIB + MIB / 2) as u64,
            }
        );
    }

    #[tokio::test]
    async fn exact_multiple_ends_with_full_eof_block() {
        let (_dir, path) = local_file(4096);
        let api = Recorder::default();

        Uploader::new(&api)
            .with_block_size(1024)
            .upload(&path, Some("given"))
            .await
            .unwrap();

        let writes = api.writes();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[3], (3072, 1024, true));
        assert!(writes[..3].iter().all(|w| !w.2));
        assert!(!api.calls().contains(&Call::CreatePath));
    }

    #[tokio::test]
    async fn directory_makes_no_remote_calls() {
        let dir = tempfile::tempdir().unwrap();
        let api = Recorder::default();

        let err = Uploader::new(&api).upload(dir.path(), None).await.unwrap_err();
        assert!(matches!(err, ClientError::Transfer(TransferError::IsDirectory(_))));
        assert!(err.to_string().contains("is a directory"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_file_makes_no_remote_calls() {
        let dir = tempfile::tempdir().unwrap();
        let api = Recorder::default();

        let err = Uploader::new(&api)
            .upload(&dir.path().join("absent"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transfer(TransferError::Io(_))));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn oversized_block_size_makes_no_remote_calls() {
        let (_dir, path) = local_file(1024);
        let api = Recorder::default();

        let err = Uploader::new(&api)
            .with_block_size(32 * MIB)
            .upload(&path, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transfer(TransferError::BlockTooLarge { size, .. }) if size == 32 * MIB
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn resume_sends_only_remaining_blocks() {
        let (_dir, path) = local_file(5 * 100);
        let api = Recorder::default();

        let report = Uploader::new(&api)
            .with_block_size(100)
            .upload_at(&path, Some("p"), 3)
            .await
            .unwrap();

        assert_eq!(api.writes(), vec![(300, 100, false), (400, 100, true)]);
        assert_eq!(report.blocks_sent, 2);
        assert_eq!(report.bytes_sent, 200);
    }

    #[tokio::test]
    async fn resume_past_end_fails_before_remote_calls() {
        let (_dir, path) = local_file(250);
        let api = Recorder::default();

        let err = Uploader::new(&api)
            .with_block_size(100)
            .upload_at(&path, None, 4)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transfer(TransferError::InvalidResume { start: 4, block_count: 3 })
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_file_opens_and_closes() {
        let (_dir, path) = local_file(0);
        let api = Recorder::default();

        let report = Uploader::new(&api).upload(&path, Some("p")).await.unwrap();
        assert_eq!(report.blocks_sent, 0);
        assert!(api.writes().is_empty());
        assert_eq!(api.calls().last(), Some(&Call::Close));
    }

    #[tokio::test]
    async fn rejected_create_sends_no_blocks() {
        let (_dir, path) = local_file(10);
        let api = Recorder {
            reject_create: true,
            ..Default::default()
        };

        let err = Uploader::new(&api).upload(&path, Some("p")).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn failed_write_aborts_without_close() {
        let (_dir, path) = local_file(300);
        let api = Recorder {
            fail_write: Some(2),
            ..Default::default()
        };

        let err = Uploader::new(&api)
            .with_block_size(100)
            .upload(&path, Some("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rpc(RpcError::Timeout)));
        assert_eq!(api.writes().len(), 2);
        assert!(!api.calls().contains(&Call::Close));
    }

    #[tokio::test]
    async fn progress_reports_follow_cadence() {
        let (_dir, path) = local_file(250);
        let api = Recorder::default();
        let (tx, mut rx) = mpsc::channel(16);

        Uploader::new(&api)
            .with_block_size(100)
            .with_progress(tx)
            .upload(&path, Some("p"))
            .await
            .unwrap();

        let mut reports = Vec::new();
        while let Ok(p) = rx.try_recv() {
            reports.push(p);
        }
        assert_eq!(reports.len(), 3);
        let last = reports.last().unwrap();
        assert!(last.is_complete());
        assert_eq!(last.bytes_sent, 250);
        assert_eq!(last.file, "data.bin");
    }
}
