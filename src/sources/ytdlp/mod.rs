pub mod parser;

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    common::errors::ResolutionError,
    configs::ResolverConfig,
    protocol::tracks::SearchResult,
    sources::plugin::{MediaExtractor, MediaInfo},
};

/// Extraction backed by the `yt-dlp` executable.
///
/// Every call spawns a fresh process which is killed if the calling future is
/// dropped, so aborting a resolution also stops the extractor.
pub struct YtDlpExtractor {
    binary: String,
    format: String,
    default_search: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            format: config.format.clone(),
            default_search: config.default_search.clone(),
            extra_args: config.extra_args.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    fn is_url(query: &str) -> bool {
        query.starts_with("https://") || query.starts_with("http://")
    }

    fn target(&self, query: &str) -> String {
        if Self::is_url(query) {
            query.to_string()
        } else {
            format!("{}:{}", self.default_search, query)
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<String, ResolutionError> {
        debug!("Running {} {:?}", self.binary, args);

        let child = Command::new(&self.binary)
            .args(&self.extra_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ResolutionError::Network(format!("failed to start {}: {}", self.binary, e))
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ResolutionError::Network(format!(
                    "{} timed out after {}s",
                    self.binary,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ResolutionError::Network(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = parser::classify_failure(&stderr);
            warn!("{} exited with {}: {}", self.binary, output.status, err);
            return Err(err);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(&self, query: &str) -> Result<MediaInfo, ResolutionError> {
        let args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--".to_string(),
            self.target(query),
        ];
        let stdout = self.run(args).await?;
        parser::parse_media(&stdout)
    }

    async fn download(
        &self,
        media: &MediaInfo,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ResolutionError> {
        let template = dir.join(format!("{}.%(ext)s", stem));
        let source = media.page_url.as_deref().unwrap_or(&media.stream_url);
        let args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "--no-simulate".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--".to_string(),
            source.to_string(),
        ];

        let stdout = self.run(args).await?;
        let path = parser::parse_download_path(&stdout)
            .map(PathBuf::from)
            .ok_or_else(|| ResolutionError::Malformed("download reported no file".into()))?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(path),
            _ => Err(ResolutionError::Malformed(format!(
                "downloaded file missing: {}",
                path.display()
            ))),
        }
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ResolutionError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let args = vec![
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--".to_string(),
            format!("{}{}:{}", self.default_search, limit.max(1), query),
        ];
        let stdout = self.run(args).await?;
        parser::parse_search(&stdout)
    }
}
