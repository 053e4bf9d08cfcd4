//! Command runners.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use uploader_client::{Client, UploadProgress, Uploader};
use uploader_server::{ServerConfig, UploadServer};

use crate::cli::{Command, ServeArgs, StatArgs, UploadArgs};
use crate::config::Config;

/// Runs one command to completion.
pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Serve(args) => serve(args, config).await,
        Command::Mkpath => mkpath(config).await,
        Command::Upload(args) => upload(args, config).await,
        Command::Stat(args) => stat(args, config).await,
    }
}

async fn serve(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let bind = match args.bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind {:?}", config.server.bind))?,
    };
    let root = args.root.unwrap_or(config.server.root);
    if config.server.token.is_empty() {
        tracing::warn!("server.token is empty, authentication disabled");
    }

    let server = Arc::new(
        UploadServer::new(ServerConfig {
            bind,
            root,
            token: config.server.token,
        })
        .await?,
    );

    let server_run = Arc::clone(&server);
    let mut run = tokio::spawn(async move { server_run.run().await });

    tokio::select! {
        result = &mut run => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down");
            server.shutdown();
            run.await??;
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<Client> {
    Client::dial(
        &config.client.address,
        &config.client.token,
        config.client.connect_options(),
    )
    .await
    .with_context(|| format!("failed to connect to {}", config.client.address))
}

async fn mkpath(config: Config) -> anyhow::Result<()> {
    let client = connect(&config).await?;
    let path_id = client.create_path().await?;
    println!("{path_id}");
    client.close();
    Ok(())
}

async fn upload(args: UploadArgs, config: Config) -> anyhow::Result<()> {
    let client = connect(&config).await?;

    let (tx, rx) = mpsc::channel(64);
    let printer = tokio::spawn(log_progress(rx));

    let report = Uploader::new(&client)
        .with_block_size(config.client.block_size)
        .with_progress(tx)
        .upload_at(&args.file, args.path_id.as_deref(), args.resume_at)
        .await
        .with_context(|| format!("upload of {} failed", args.file.display()))?;

    // The uploader owned the only sender, so the printer drains and exits.
    let _ = printer.await;
    client.close();

    let remote: PathBuf = [report.path_id.as_str(), file_name(&args.file)?]
        .iter()
        .collect();
    println!("{}", remote.display());
    tracing::info!(
        path_id = %report.path_id,
        blocks = report.blocks_sent,
        bytes = report.bytes_sent,
        "upload finished"
    );
    Ok(())
}

async fn stat(args: StatArgs, config: Config) -> anyhow::Result<()> {
    let client = connect(&config).await?;
    let info = client.stat(&args.name).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    client.close();
    Ok(())
}

async fn log_progress(mut rx: mpsc::Receiver<UploadProgress>) {
    while let Some(p) = rx.recv().await {
        let pct = if p.blocks_total == 0 {
            100
        } else {
            p.blocks_done * 100 / p.blocks_total
        };
        tracing::info!(
            file = %p.file,
            "{pct}% ({}/{} blocks, {} bytes)",
            p.blocks_done,
            p.blocks_total,
            p.bytes_sent
        );
    }
}

fn file_name(path: &std::path::Path) -> anyhow::Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no file name", path.display()))
}
