use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncReadExt, process::Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ConnectionHandle, OutputTransport, PlaybackReporter};
use crate::{
    common::errors::PlaybackError,
    configs::OutputConfig,
    protocol::tracks::{Locator, ResolveMode, ResolvedSource},
};

/// Bytes of stderr kept for the failure message.
const STDERR_TAIL: usize = 512;

/// Spawns the configured player once per track.
pub struct ProcessTransport {
    program: String,
    args: Vec<String>,
    stream_args: Vec<String>,
}

impl ProcessTransport {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            stream_args: config.stream_args.clone(),
        }
    }

    fn command_args(&self, connection: &ConnectionHandle, source: &ResolvedSource) -> Vec<String> {
        let input = source.locator.as_input();
        let streamed =
            source.mode == ResolveMode::Stream && matches!(source.locator, Locator::Remote(_));

        let prefix: &[String] = if streamed { &self.stream_args } else { &[] };
        prefix
            .iter()
            .chain(self.args.iter())
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{target}", &connection.target)
            })
            .collect()
    }
}

fn tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|i| text.len() - i <= STDERR_TAIL)
        .unwrap_or(text.len());
    text[start..].to_string()
}

#[async_trait]
impl OutputTransport for ProcessTransport {
    async fn play(
        &self,
        connection: &ConnectionHandle,
        source: &ResolvedSource,
        reporter: PlaybackReporter,
        cancel: CancellationToken,
    ) {
        let args = self.command_args(connection, source);
        debug!("Spawning {} {:?}", self.program, args);

        let mut child = match Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                reporter.failed(PlaybackError::TransportFailure(format!(
                    "failed to start {}: {}",
                    self.program, e
                )));
                return;
            }
        };

        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });

        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", self.program, e);
                }
                reporter.failed(PlaybackError::TransportFailure("cancelled".into()));
            }
            status = child.wait() => {
                let stderr = match stderr_task {
                    Some(task) => task.await.unwrap_or_default(),
                    None => Vec::new(),
                };
                match status {
                    Ok(status) if status.success() => reporter.finished(),
                    Ok(status) => {
                        let detail = tail(&stderr);
                        reporter.failed(PlaybackError::TransportFailure(if detail.is_empty() {
                            format!("{} exited with {}", self.program, status)
                        } else {
                            format!("{} exited with {}: {}", self.program, status, detail)
                        }));
                    }
                    Err(e) => reporter.failed(PlaybackError::TransportFailure(e.to_string())),
                }
            }
        }
    }
}
