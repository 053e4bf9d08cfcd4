use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque handle addressing one server-side file session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the zero id sent alongside a failed result.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a probed filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata of a local or remote file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatInfo {
    pub kind: FileKind,
    /// Size in bytes; always 0 for directories.
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Final path component.
    pub name: String,
}

impl StatInfo {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn session_id_is_a_bare_string_on_the_wire() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn stat_info_camel_case() {
        let info = StatInfo {
            kind: FileKind::File,
            size: 42,
            last_modified: DateTime::<Utc>::UNIX_EPOCH,
            name: "file.txt".into(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"lastModified\""));
        assert!(json.contains("\"kind\":\"File\""));
        assert!(!info.is_dir());
    }
}
