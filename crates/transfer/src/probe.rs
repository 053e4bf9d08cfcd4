//! Local file prober.

use std::path::Path;

use chrono::{DateTime, Utc};
use uploader_protocol::types::{FileKind, StatInfo};

use crate::TransferError;

/// Reads the metadata of `path`.
///
/// Directories report size 0. Missing files and permission errors surface as
/// [`TransferError::Io`].
pub async fn probe(path: &Path) -> Result<StatInfo, TransferError> {
    let meta = tokio::fs::metadata(path).await?;

    let (kind, size) = if meta.is_dir() {
        (FileKind::Directory, 0)
    } else {
        (FileKind::File, meta.len())
    };

    let last_modified: DateTime<Utc> = meta.modified()?.into();

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    Ok(StatInfo {
        kind,
        size,
        last_modified,
        name,
    })
}
