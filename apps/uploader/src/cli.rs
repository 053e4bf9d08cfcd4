//! Command-line interface.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "uploader", version, about = "Chunked file upload over RPC")]
pub struct Cli {
    /// Configuration file (default: ~/.config/uploader/uploader.toml).
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the upload server.
    Serve(ServeArgs),
    /// Allocate a fresh upload directory on the server and print its id.
    Mkpath,
    /// Upload a local file.
    Upload(UploadArgs),
    /// Print metadata of a file on the server.
    Stat(StatArgs),
}

#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// Listen address (overrides `server.bind`).
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Upload root directory (overrides `server.root`).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct UploadArgs {
    /// Local file to upload.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Existing upload directory id; a new one is allocated when omitted.
    #[arg(long)]
    pub path_id: Option<String>,

    /// Block index to resume from.
    #[arg(long, default_value_t = 0)]
    pub resume_at: u64,
}

#[derive(Debug, Parser)]
pub struct StatArgs {
    /// File name relative to the server root.
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli =
            Cli::try_parse_from(["uploader", "serve", "--bind", "127.0.0.1:9000", "--root", "/srv"])
                .unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.bind, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(args.root, Some(PathBuf::from("/srv")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_upload_with_resume() {
        let cli = Cli::try_parse_from([
            "uploader",
            "--config",
            "/tmp/u.toml",
            "upload",
            "big.iso",
            "--path-id",
            "abc",
            "--resume-at",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/u.toml")));
        match cli.command {
            Command::Upload(args) => {
                assert_eq!(args.file, PathBuf::from("big.iso"));
                assert_eq!(args.path_id.as_deref(), Some("abc"));
                assert_eq!(args.resume_at, 7);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn upload_defaults() {
        let cli = Cli::try_parse_from(["uploader", "upload", "a.bin"]).unwrap();
        match cli.command {
            Command::Upload(args) => {
                assert!(args.path_id.is_none());
                assert_eq!(args.resume_at, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_bind_address() {
        assert!(Cli::try_parse_from(["uploader", "serve", "--bind", "not-an-addr"]).is_err());
    }

    #[test]
    fn stat_requires_name() {
        assert!(Cli::try_parse_from(["uploader", "stat"]).is_err());
        assert!(Cli::try_parse_from(["uploader", "mkpath"]).is_ok());
    }
}
