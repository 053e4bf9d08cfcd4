use serde::{Deserialize, Serialize};

use crate::types::SessionId;

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Asks the server to allocate a new upload directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    /// Must equal [`CREATE_TOKEN`](crate::constants::CREATE_TOKEN).
    pub request_token: String,
}

/// Names a file on the server (`Create`, `Open`, `Stat`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub filename: String,
    /// Path token from `CreatePath`; only used by `Create`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// Addresses an existing session (`Close`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: SessionId,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Result of `CreatePath`. `id` is empty when `result` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResponse {
    pub id: String,
    pub result: bool,
}

/// Result of `Create`, `Open` and `Close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(default)]
    pub session_id: SessionId,
    pub result: bool,
}

impl SessionResponse {
    pub fn ok(session_id: SessionId) -> Self {
        Self {
            session_id,
            result: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            session_id: SessionId::default(),
            result: false,
        }
    }
}

/// Acknowledges one block write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub session_id: SessionId,
    pub offset: u64,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_request_omits_empty_path() {
        let req = FileRequest {
            filename: "file.txt".into(),
            path: String::new(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"filename":"file.txt"}"#);

        let parsed: FileRequest = serde_json::from_str(&json).unwrap();
        assert!(parsed.path.is_empty());
    }

    #[test]
    fn session_response_failed_has_zero_id() {
        let resp = SessionResponse::failed();
        assert!(resp.session_id.is_empty());
        assert!(!resp.result);
    }

    #[test]
    fn write_response_field_names() {
        let resp = WriteResponse {
            session_id: "s1".into(),
            offset: 1_048_576,
            size: 524_288,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"sessionId\":\"s1\""));
        assert!(json.contains("\"offset\":1048576"));
    }
}
