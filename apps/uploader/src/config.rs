//! Uploader configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/uploader/uploader.toml`
//! - Windows: `%APPDATA%/uploader/uploader.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uploader_protocol::constants::{BLOCK_SIZE, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
use uploader_rpc::{ConnectOptions, generate_token};

/// Default listen/dial port.
const DEFAULT_PORT: u16 = 8889;

/// Full configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub client: ClientSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory uploads are stored under.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Token clients must present (empty disables authentication).
    #[serde(default)]
    pub token: String,
}

/// `[client]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    /// Server address (`host:port`).
    #[serde(default = "default_address")]
    pub address: String,

    /// Token presented to the server.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Upload block size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

fn default_bind() -> String {
    format!("0.0.0.0:{DEFAULT_PORT}")
}

fn default_root() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_address() -> String {
    format!("127.0.0.1:{DEFAULT_PORT}")
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT.as_secs()
}

fn default_block_size() -> usize {
    BLOCK_SIZE
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            root: default_root(),
            token: String::new(),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            block_size: default_block_size(),
        }
    }
}

impl ClientSection {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }
}

impl Config {
    /// A fresh configuration whose server and client share a new token.
    pub fn generate() -> Self {
        let token = generate_token();
        let mut config = Config::default();
        config.server.token = token.clone();
        config.client.token = token;
        config
    }

    /// Loads `path` (or the default location), creating it with a freshly
    /// generated token if it does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok((config, path))
        } else {
            let config = Config::generate();
            config.save(&path)?;
            tracing::info!(path = %path.display(), "created default configuration");
            Ok((config, path))
        }
    }

    /// Writes the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Holds the auth token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("uploader").join("uploader.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("uploader")
            .join("uploader.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:8889");
        assert_eq!(config.server.root, PathBuf::from("uploads"));
        assert!(config.server.token.is_empty());
        assert_eq!(config.client.address, "127.0.0.1:8889");
        assert_eq!(config.client.block_size, 1024 * 1024);
        assert_eq!(config.client.connect_timeout_secs, 5);
        assert_eq!(config.client.call_timeout_secs, 120);
    }

    #[test]
    fn generated_config_shares_token() {
        let config = Config::generate();
        assert_eq!(config.server.token.len(), 32);
        assert_eq!(config.server.token, config.client.token);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml_str = r#"
[client]
address = "10.0.0.5:9000"
block_size = 4096
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.client.address, "10.0.0.5:9000");
        assert_eq!(config.client.block_size, 4096);
        assert_eq!(config.client.call_timeout_secs, 120);
        assert_eq!(config.server.bind, "0.0.0.0:8889");
    }

    #[test]
    fn connect_options_from_secs() {
        let client = ClientSection {
            connect_timeout_secs: 2,
            call_timeout_secs: 30,
            ..ClientSection::default()
        };
        let opts = client.connect_options();
        assert_eq!(opts.connect_timeout, Duration::from_secs(2));
        assert_eq!(opts.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn load_creates_then_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("uploader.toml");

        let (created, created_at) = Config::load(Some(&path)).unwrap();
        assert_eq!(created_at, path);
        assert!(path.exists());
        assert!(!created.server.token.is_empty());

        let (loaded, _) = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.server.token, created.server.token);
        assert_eq!(loaded.client.token, created.client.token);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("uploader"));
    }
}
