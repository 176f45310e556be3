use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::control::{ControlCommand, ControlMessage};
use crate::renderer::Feature;

/// Get the socket path for IPC
pub fn socket_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(dir).join("bitwave.sock")
    } else {
        PathBuf::from("/tmp/bitwave.sock")
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow::anyhow!("Expected on or off, got '{}'", value)),
    }
}

fn parse_feature(name: &str) -> Result<Feature> {
    name.parse::<Feature>().map_err(|e| anyhow::anyhow!(e))
}

/// Parse a protocol line into a ControlCommand
pub fn parse_command(line: &str) -> Result<ControlCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["toggle", feature] => Ok(ControlCommand::Toggle(parse_feature(feature)?)),
        ["set", feature, value] => Ok(ControlCommand::Set(
            parse_feature(feature)?,
            parse_switch(value)?,
        )),
        ["play"] | ["pause"] => Ok(ControlCommand::PlayPause),
        ["volume", val] => {
            let v: f32 = val.parse().context("Invalid volume value")?;
            Ok(ControlCommand::SetGain(v.clamp(0.0, 1.0)))
        }
        ["track", "next"] => Ok(ControlCommand::NextTrack),
        ["track", "prev"] => Ok(ControlCommand::PrevTrack),
        ["track", index] => {
            let i: usize = index.parse().context("Invalid track index")?;
            Ok(ControlCommand::SelectTrack(i))
        }
        ["fullscreen"] => Ok(ControlCommand::Fullscreen),
        ["status"] => Ok(ControlCommand::Status),
        ["list", "features"] => Ok(ControlCommand::ListFeatures),
        ["list", "tracks"] => Ok(ControlCommand::ListTracks),
        ["ping"] => Ok(ControlCommand::Ping),
        ["quit"] => Ok(ControlCommand::Quit),
        _ => Err(anyhow::anyhow!("Unknown command: {}", line)),
    }
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, cmd_tx: mpsc::Sender<ControlMessage>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();
    buf_reader.read_line(&mut line).await?;
    let line = line.trim();

    if line.is_empty() {
        return Ok(());
    }

    let command = match parse_command(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            writer
                .write_all(format!("err: {}\n", e).as_bytes())
                .await?;
            return Ok(());
        }
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(ControlMessage::with_reply(command, reply_tx))
        .await
        .map_err(|_| anyhow::anyhow!("Render loop has shut down"))?;

    let response = reply_rx
        .await
        .unwrap_or_else(|_| "err: internal error".to_string());

    writer
        .write_all(format!("{}\n", response).as_bytes())
        .await?;
    Ok(())
}

/// Start the IPC server, listening for commands on a Unix socket
pub async fn start_server(cmd_tx: mpsc::Sender<ControlMessage>) -> Result<()> {
    let path = socket_path();

    // Remove stale socket from previous run
    let _ = std::fs::remove_file(&path);

    let listener = UnixListener::bind(&path).context("Failed to bind IPC socket")?;

    info!("IPC server listening on {}", path.display());

    loop {
        let (stream, _) = listener.accept().await?;
        let cmd_tx = cmd_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, cmd_tx).await {
                debug!("IPC client error: {}", e);
            }
        });
    }
}

/// Send a command to a running bitwave instance (client mode)
pub async fn send_command(line: &str) -> Result<String> {
    let path = socket_path();

    let stream = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        UnixStream::connect(&path),
    )
    .await
    .context("Connection timed out")?
    .context("Could not connect to bitwave. Is it running?")?;

    let (reader, mut writer) = stream.into_split();

    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.shutdown().await?;

    let mut buf_reader = BufReader::new(reader);
    let mut response = String::new();

    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        buf_reader.read_line(&mut response),
    )
    .await
    .context("Response timed out")?
    .context("Failed to read response")?;

    Ok(response.trim().to_string())
}
