/// Data models shared across Vidharbor crates.
use serde::{Deserialize, Serialize};

/// Summary of a probed video, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    /// Unique vertical resolutions, highest first.
    pub resolutions: Vec<u32>,
}

/// One completed download, as persisted in the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub title: String,
    /// Basename under the download directory.
    pub filename: String,
    pub thumbnail: String,
}

/// Validated input for a single download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub resolution: u32,
    pub title: String,
    pub thumbnail: String,
}

/// Raw metadata reported by the extraction engine for one video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVideoInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
    /// Present when the URL resolved to a playlist.
    #[serde(default)]
    pub entries: Vec<RawVideoInfo>,
}

impl RawVideoInfo {
    /// The video itself, or the first entry of a playlist-shaped result.
    pub fn into_single(mut self) -> RawVideoInfo {
        if self.formats.is_empty() && !self.entries.is_empty() {
            self.entries.swap_remove(0)
        } else {
            self
        }
    }
}

/// A single stream entry from the engine's format list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub ext: Option<String>,
}

impl RawFormat {
    pub fn with_height(height: u32) -> Self {
        Self {
            height: Some(height),
            ..Default::default()
        }
    }
}
