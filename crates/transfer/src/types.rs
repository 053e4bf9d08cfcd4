/// One block of a local file, ready to send.
#[derive(Debug, Clone)]
pub struct Block {
    /// Position of the block in the transfer plan.
    pub index: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw block data (shorter than the block size only for the final block).
    pub data: Vec<u8>,
    /// Set on the final block of the file.
    pub eof: bool,
}

impl Block {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Progress of one upload, emitted at the cadence set by
/// [`ProgressCadence`](crate::ProgressCadence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    /// Local file being uploaded.
    pub file: String,
    /// Blocks acknowledged in this run (resumed blocks not counted).
    pub blocks_done: u64,
    /// Blocks this run has to send.
    pub blocks_total: u64,
    pub bytes_sent: u64,
}

impl UploadProgress {
    pub fn is_complete(&self) -> bool {
        self.blocks_done == self.blocks_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_is_data_len() {
        let block = Block {
            index: 2,
            offset: 8,
            data: b"EE".to_vec(),
            eof: true,
        };
        assert_eq!(block.size(), 2);
    }

    #[test]
    fn progress_completion() {
        let mut p = UploadProgress {
            file: "a.bin".into(),
            blocks_done: 2,
            blocks_total: 3,
            bytes_sent: 8,
        };
        assert!(!p.is_complete());
        p.blocks_done = 3;
        assert!(p.is_complete());
    }
}
