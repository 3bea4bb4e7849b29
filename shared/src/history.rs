/// Durable download history, newest first.
///
/// Stored as a pretty-printed JSON array. Writes go to a sibling temp file
/// that is renamed over the target, so readers see either the old or the
/// new array. Appends run under a single-writer lock so two downloads
/// finishing together cannot drop each other's record.
use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::HistoryError;
use crate::models::DownloadRecord;

pub struct HistoryStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// Load the history, distinguishing a bad file from an absent one.
    ///
    /// A missing file is a valid, empty history.
    pub async fn load(&self) -> Result<Vec<DownloadRecord>, HistoryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::Unreadable(e)),
        };
        serde_json::from_slice(&bytes).map_err(HistoryError::Corrupt)
    }

    /// Read policy used by callers: an unreadable or corrupt store is
    /// logged and treated as empty.
    pub async fn read(&self) -> Vec<DownloadRecord> {
        self.load().await.unwrap_or_else(|e| {
            warn!("Ignoring history at {}: {}", self.path.display(), e);
            Vec::new()
        })
    }

    /// Replace the whole store.
    pub async fn write(&self, history: &[DownloadRecord]) -> std::io::Result<()> {
        let _guard = self.writer.lock().await;
        self.write_unlocked(history).await
    }

    /// Insert `record` at index 0.
    pub async fn append_front(&self, record: DownloadRecord) -> std::io::Result<()> {
        let _guard = self.writer.lock().await;
        let mut history = self.read().await;
        history.insert(0, record);
        self.write_unlocked(&history).await?;
        debug!("History now holds {} records", history.len());
        Ok(())
    }

    async fn write_unlocked(&self, history: &[DownloadRecord]) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(history)?;
        let tmp = self.temp_path();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
