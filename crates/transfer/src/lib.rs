//! Chunked transfer building blocks: block planning and reads, local file
//! probing, path validation and progress cadence.

mod chunked;
mod probe;
mod progress;
mod types;
mod validation;

pub use chunked::{BlockReader, TransferPlan};
pub use probe::probe;
pub use progress::ProgressCadence;
pub use types::{Block, UploadProgress};
pub use validation::validate_relative_path;

pub use uploader_protocol::constants::{BLOCK_SIZE, MAX_BLOCK_SIZE};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is a directory")]
    IsDirectory(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("resume block {start} is past the end of the file ({block_count} blocks)")]
    InvalidResume { start: u64, block_count: u64 },

    #[error("block size {size} exceeds the {max} byte limit")]
    BlockTooLarge { size: usize, max: usize },

    #[error("block {index} out of range ({block_count} blocks)")]
    BlockOutOfRange { index: u64, block_count: u64 },
}
