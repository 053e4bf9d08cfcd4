use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::types::Block;
use crate::{BLOCK_SIZE, MAX_BLOCK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// TransferPlan
// ---------------------------------------------------------------------------

/// Division of a file of `file_size` bytes into fixed-size blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    file_size: u64,
    block_size: usize,
}

impl TransferPlan {
    /// Plans a transfer. A `block_size` of 0 falls back to [`BLOCK_SIZE`].
    pub fn new(file_size: u64, block_size: usize) -> Self {
        let block_size = if block_size == 0 {
            BLOCK_SIZE
        } else {
            block_size
        };
        Self {
            file_size,
            block_size,
        }
    }

    /// `ceil(file_size / block_size)`; 0 for an empty file.
    pub fn block_count(&self) -> u64 {
        self.file_size.div_ceil(self.block_size as u64)
    }

    /// Byte offset of block `index`.
    pub fn block_offset(&self, index: u64) -> u64 {
        index * self.block_size as u64
    }

    /// Number of bytes in block `index` (0 past the end).
    pub fn block_len(&self, index: u64) -> usize {
        let offset = self.block_offset(index);
        if offset >= self.file_size {
            return 0;
        }
        (self.file_size - offset).min(self.block_size as u64) as usize
    }

    /// Returns `true` for the final block of a non-empty file.
    pub fn is_last(&self, index: u64) -> bool {
        index + 1 == self.block_count()
    }

    /// Checks a resume index. Resuming exactly at `block_count` is allowed
    /// and sends nothing.
    pub fn validate_start(&self, start: u64) -> Result<(), TransferError> {
        let block_count = self.block_count();
        if start > block_count {
            return Err(TransferError::InvalidResume { start, block_count });
        }
        Ok(())
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

// ---------------------------------------------------------------------------
// BlockReader
// ---------------------------------------------------------------------------

/// Reads a local file one block at a time, addressed by block index.
pub struct BlockReader {
    file: tokio::fs::File,
    plan: TransferPlan,
}

impl BlockReader {
    /// Opens `path` and plans it with `block_size`.
    ///
    /// A block size over [`MAX_BLOCK_SIZE`] is rejected before the file is
    /// touched.
    pub async fn open(path: &Path, block_size: usize) -> Result<Self, TransferError> {
        if block_size > MAX_BLOCK_SIZE {
            return Err(TransferError::BlockTooLarge {
                size: block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        let file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();
        Ok(Self {
            file,
            plan: TransferPlan::new(file_size, block_size),
        })
    }

    pub fn plan(&self) -> &TransferPlan {
        &self.plan
    }

    /// Reads block `index`.
    ///
    /// Short reads are retried until the block is full or the file ends;
    /// reaching end-of-file is not an error. `eof` is set on the last
    /// planned block and on any block shorter than the block size.
    pub async fn read_block(&mut self, index: u64) -> Result<Block, TransferError> {
        let block_count = self.plan.block_count();
        if index >= block_count {
            return Err(TransferError::BlockOutOfRange { index, block_count });
        }

        let offset = self.plan.block_offset(index);
        self.file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; self.plan.block_size()];
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);

        let eof = filled < self.plan.block_size() || self.plan.is_last(index);
        Ok(Block {
            index,
            offset,
            data: buf,
            eof,
        })
    }
}
