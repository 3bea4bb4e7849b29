/// Bindings to the external extraction/merge engine.
///
/// The engine is treated as a black box exposing two calls: a metadata
/// probe and a fetch that downloads and merges the selected streams into a
/// single file. `YtDlpEngine` drives the `yt-dlp` executable as a child
/// process; tests substitute their own `MediaEngine`.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::EngineError;
use crate::format_selector::{FormatSelector, TARGET_CONTAINER};
use crate::models::RawVideoInfo;

/// Output filename template: `<title> [<id>].<ext>`.
pub const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Where and how the engine should write a download.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    pub merge_format: String,
}

impl DownloadTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            merge_format: TARGET_CONTAINER.to_string(),
        }
    }

    /// Full output template rooted in the download directory.
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(OUTPUT_TEMPLATE)
    }
}

#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Fetch metadata for a single video (playlist expansion disabled).
    async fn probe(&self, url: &str) -> Result<RawVideoInfo, EngineError>;

    /// Download the streams picked by `selector`, merge them, and return
    /// the final path as resolved by the engine after merging.
    async fn fetch_and_merge(
        &self,
        url: &str,
        selector: &FormatSelector,
        target: &DownloadTarget,
    ) -> Result<PathBuf, EngineError>;
}

/// `yt-dlp` command-line engine.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    bin: String,
    ffmpeg_location: Option<String>,
    probe_timeout: Duration,
}

impl YtDlpEngine {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            ffmpeg_location: None,
            probe_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_ffmpeg_location(mut self, location: Option<String>) -> Self {
        self.ffmpeg_location = location;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    fn spawn_error(&self, e: std::io::Error) -> EngineError {
        EngineError::Spawn {
            bin: self.bin.clone(),
            reason: e.to_string(),
        }
    }
}

fn probe_args(url: &str) -> Vec<String> {
    vec![
        "--dump-single-json".to_string(),
        "--no-playlist".to_string(),
        // Playlist-only URLs still expand; keep just the first entry.
        "--playlist-items".to_string(),
        "1".to_string(),
        "--no-warnings".to_string(),
        url.to_string(),
    ]
}

fn fetch_args(
    url: &str,
    selector: &FormatSelector,
    target: &DownloadTarget,
    ffmpeg_location: Option<&str>,
) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        selector.to_string(),
        "--no-playlist".to_string(),
        "--playlist-items".to_string(),
        "1".to_string(),
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
        "-o".to_string(),
        target.output_template().to_string_lossy().to_string(),
        "--merge-output-format".to_string(),
        target.merge_format.clone(),
        // Printed once the file has reached its final name, after merging.
        "--print".to_string(),
        "after_move:filepath".to_string(),
    ];

    if let Some(location) = ffmpeg_location {
        args.push("--ffmpeg-location".to_string());
        args.push(location.to_string());
    }

    args.push(url.to_string());
    args
}

/// Last non-empty stdout line is the final file path.
fn parse_final_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

fn failure_message(stderr: &str, status: std::process::ExitStatus) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("yt-dlp exited with {}", status)
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn probe(&self, url: &str) -> Result<RawVideoInfo, EngineError> {
        debug!("Probing {} with {}", url, self.bin);

        let output = tokio::time::timeout(
            self.probe_timeout,
            Command::new(&self.bin)
                .args(probe_args(url))
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| EngineError::Timeout(self.probe_timeout.as_secs()))?
        .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed {
                stderr: failure_message(&stderr, output.status),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::InvalidOutput(e.to_string()))
    }

    async fn fetch_and_merge(
        &self,
        url: &str,
        selector: &FormatSelector,
        target: &DownloadTarget,
    ) -> Result<PathBuf, EngineError> {
        let args = fetch_args(url, selector, target, self.ffmpeg_location.as_deref());
        info!("Starting yt-dlp: url={} format={}", url, selector);

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::InvalidOutput("No stdout handle".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::InvalidOutput("No stderr handle".into()))?;

        // Forward stderr to tracing while keeping it for the error message.
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "ytdlp", "{}", line);
                collected.push(line);
            }
            collected.join("\n")
        });

        let mut out = String::new();
        stdout
            .read_to_string(&mut out)
            .await
            .map_err(|e| EngineError::InvalidOutput(e.to_string()))?;

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(EngineError::Failed {
                stderr: failure_message(&stderr, status),
            });
        }

        parse_final_path(&out).ok_or_else(|| {
            EngineError::InvalidOutput("yt-dlp did not report the output file".into())
        })
    }
}

/// Strip any directory component from an engine-reported path.
pub fn basename(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
}
