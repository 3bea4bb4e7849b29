/// API route handlers for Vidharbor.
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vidharbor_shared::models::{DownloadRecord, VideoInfo};
use vidharbor_shared::orchestrator::validate_request;
use vidharbor_shared::resolver;

use crate::error::ApiResult;
use crate::AppState;

// ====== REQUEST / RESPONSE TYPES ======

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct VideoInfoBody {
    pub url: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct DownloadBody {
    pub url: Option<String>,
    /// Accepted as a number or a numeric string.
    pub resolution: Option<serde_json::Value>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

impl DownloadBody {
    fn resolution(&self) -> Option<u32> {
        match self.resolution.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().trim_end_matches('p').parse().ok(),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub message: String,
    pub filename: String,
}

// ====== ROUTES ======

/// POST /get_video_info
pub async fn get_video_info(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VideoInfoBody>,
) -> ApiResult<Json<VideoInfo>> {
    let url = body.url.unwrap_or_default();
    let info = resolver::probe(state.orchestrator.engine(), &url).await?;
    Ok(Json(info))
}

/// POST /download_video
///
/// Runs the download on the queue and waits for it to finish.
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DownloadBody>,
) -> ApiResult<Json<DownloadResponse>> {
    let request = validate_request(
        body.url.as_deref().unwrap_or_default(),
        body.resolution(),
        body.title.as_deref().unwrap_or_default(),
        body.thumbnail.as_deref().unwrap_or_default(),
    )?;

    let orchestrator = state.orchestrator.clone();
    let handle = state
        .queue
        .submit(request.url.clone(), async move { orchestrator.download(request).await })
        .await;
    info!("Download job {} submitted", handle.job_id);

    let record = handle.wait().await?;
    Ok(Json(DownloadResponse {
        message: "Download complete!".to_string(),
        filename: record.filename,
    }))
}

/// GET /history
pub async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<DownloadRecord>> {
    Json(state.orchestrator.history().read().await)
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.queue.stats().await;
    Json(serde_json::json!({ "status": "ok", "downloads": stats }))
}
