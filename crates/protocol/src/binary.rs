//! Binary frame for block writes: 4-byte big-endian header length + JSON header + raw block.
//!
//! ```text
//! [4 bytes BE: header_len][header_len bytes: WriteHeader JSON][rest: block data]
//! ```

use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Header of a `WriteAt` frame. The block bytes follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteHeader {
    /// Correlation id of the call.
    pub id: String,
    pub session_id: SessionId,
    pub offset: u64,
    /// Number of data bytes following the header.
    pub size: usize,
    /// Set on the final block of the file.
    pub eof: bool,
}

/// Encodes a header and block into one binary frame.
pub fn encode_write_frame(header: &WriteHeader, data: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let header_json = serde_json::to_vec(header)?;
    let header_len = header_json.len() as u32;

    let mut buf = Vec::with_capacity(4 + header_json.len() + data.len());
    buf.extend_from_slice(&header_len.to_be_bytes());
    buf.extend_from_slice(&header_json);
    buf.extend_from_slice(data);
    Ok(buf)
}

/// Splits a binary frame into its header and block data.
pub fn parse_write_frame(frame: &[u8]) -> Result<(WriteHeader, Vec<u8>), FrameError> {
    if frame.len() < 4 {
        return Err(FrameError::TooShort);
    }

    let header_len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

    if frame.len() < 4 + header_len {
        return Err(FrameError::HeaderTruncated {
            expected: header_len,
            got: frame.len() - 4,
        });
    }

    let header: WriteHeader = serde_json::from_slice(&frame[4..4 + header_len])
        .map_err(|e| FrameError::InvalidJson(e.to_string()))?;
    let data = frame[4 + header_len..].to_vec();

    Ok((header, data))
}

/// Errors from binary frame parsing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame too short (need at least 4 bytes)")]
    TooShort,

    #[error("header truncated: expected {expected} bytes, got {got}")]
    HeaderTruncated { expected: usize, got: usize },

    #[error("invalid header JSON: {0}")]
    InvalidJson(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(size: usize) -> WriteHeader {
        WriteHeader {
            id: "w-1".into(),
            session_id: "s-1".into(),
            offset: 2_097_152,
            size,
            eof: true,
        }
    }

    #[test]
    fn frame_layout() {
        let data = b"block bytes";
        let frame = encode_write_frame(&header(data.len()), data).unwrap();

        let header_len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        let json: serde_json::Value = serde_json::from_slice(&frame[4..4 + header_len]).unwrap();
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["eof"], true);
        assert_eq!(&frame[4 + header_len..], data);
    }

    #[test]
    fn parse_recovers_header_and_data() {
        let data = vec![0xAB; 300];
        let frame = encode_write_frame(&header(300), &data).unwrap();
        let (h, d) = parse_write_frame(&frame).unwrap();
        assert_eq!(h, header(300));
        assert_eq!(d, data);
    }

    #[test]
    fn parse_empty_block() {
        let frame = encode_write_frame(&header(0), &[]).unwrap();
        let (_, d) = parse_write_frame(&frame).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn parse_too_short() {
        assert!(matches!(
            parse_write_frame(&[0, 0]),
            Err(FrameError::TooShort)
        ));
    }

    #[test]
    fn parse_truncated_header() {
        let frame = [0, 0, 0, 50, b'{'];
        assert!(matches!(
            parse_write_frame(&frame),
            Err(FrameError::HeaderTruncated {
                expected: 50,
                got: 1
            })
        ));
    }

    #[test]
    fn parse_invalid_json() {
        let mut frame = 3u32.to_be_bytes().to_vec();
        frame.extend_from_slice(b"{{{");
        assert!(matches!(
            parse_write_frame(&frame),
            Err(FrameError::InvalidJson(_))
        ));
    }
}
