/// Download orchestration: selector -> engine -> history.
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::{basename, DownloadTarget, MediaEngine};
use crate::errors::{VidharborError, VidharborResult};
use crate::format_selector::FormatSelector;
use crate::history::HistoryStore;
use crate::models::{DownloadRecord, DownloadRequest};

/// Check that every download field is present and non-empty.
///
/// Whitespace-only values count as empty, but title and thumbnail are kept
/// exactly as the caller sent them.
pub fn validate_request(
    url: &str,
    resolution: Option<u32>,
    title: &str,
    thumbnail: &str,
) -> VidharborResult<DownloadRequest> {
    let url = url.trim();
    let resolution = resolution.filter(|r| *r > 0);
    let present = |s: &str| !s.trim().is_empty();

    match resolution {
        Some(resolution) if present(url) && present(title) && present(thumbnail) => {
            Ok(DownloadRequest {
                url: url.to_string(),
                resolution,
                title: title.to_string(),
                thumbnail: thumbnail.to_string(),
            })
        }
        _ => Err(VidharborError::invalid(
            "URL, resolution, title, and thumbnail are required",
        )),
    }
}

pub struct Orchestrator {
    engine: Arc<dyn MediaEngine>,
    history: Arc<HistoryStore>,
    target: DownloadTarget,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn MediaEngine>, history: Arc<HistoryStore>, download_dir: &Path) -> Self {
        Self {
            engine,
            history,
            target: DownloadTarget::new(download_dir),
        }
    }

    pub fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Download and merge one video, then record it at the head of history.
    ///
    /// The history entry keeps the caller's title and thumbnail; only the
    /// filename comes from the engine. Nothing is recorded on failure.
    pub async fn download(&self, request: DownloadRequest) -> VidharborResult<DownloadRecord> {
        let selector = FormatSelector::build(request.resolution);
        info!(
            "Downloading {} at <= {}p (selector: {})",
            request.url, request.resolution, selector
        );

        let path = self
            .engine
            .fetch_and_merge(&request.url, &selector, &self.target)
            .await
            .map_err(|e| {
                warn!("Download failed for {}: {}", request.url, e);
                VidharborError::DownloadFailed {
                    message: e.to_string(),
                }
            })?;

        let filename = basename(&path).ok_or_else(|| VidharborError::DownloadFailed {
            message: format!("engine reported an unusable output path: {}", path.display()),
        })?;

        let record = DownloadRecord {
            title: request.title,
            filename,
            thumbnail: request.thumbnail,
        };

        self.history.append_front(record.clone()).await?;
        info!("Download complete: {}", record.filename);
        Ok(record)
    }
}
