/// Metadata resolver: reduces raw engine metadata to what the client needs.
use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::engine::MediaEngine;
use crate::errors::{VidharborError, VidharborResult};
use crate::models::{RawFormat, VideoInfo};

/// Probe `url` once and summarise title, thumbnail and resolutions.
pub async fn probe(engine: &dyn MediaEngine, url: &str) -> VidharborResult<VideoInfo> {
    let url = url.trim();
    if url.is_empty() {
        return Err(VidharborError::invalid("URL is required"));
    }

    let raw = engine.probe(url).await.map_err(|e| {
        warn!("Probe failed for {}: {}", url, e);
        VidharborError::ExtractionFailed {
            message: e.to_string(),
        }
    })?;
    let raw = raw.into_single();

    let resolutions = collect_resolutions(&raw.formats);
    info!("Probed {}: {} resolutions", url, resolutions.len());

    Ok(VideoInfo {
        title: raw.title.unwrap_or_default(),
        thumbnail: raw.thumbnail.unwrap_or_default(),
        resolutions,
    })
}

/// Unique positive heights, highest first.
pub fn collect_resolutions(formats: &[RawFormat]) -> Vec<u32> {
    formats
        .iter()
        .filter_map(|f| f.height)
        .filter(|h| *h > 0)
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .rev()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DownloadTarget;
    use crate::errors::EngineError;
    use crate::format_selector::FormatSelector;
    use crate::models::RawVideoInfo;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ProbeOnly {
        result: Result<RawVideoInfo, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaEngine for ProbeOnly {
        async fn probe(&self, _url: &str) -> Result<RawVideoInfo, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|stderr| EngineError::Failed { stderr })
        }

        async fn fetch_and_merge(
            &self,
            _url: &str,
            _selector: &FormatSelector,
            _target: &DownloadTarget,
        ) -> Result<PathBuf, EngineError> {
            unreachable!("probe-only engine")
        }
    }

    fn engine(result: Result<RawVideoInfo, String>) -> ProbeOnly {
        ProbeOnly {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_collect_resolutions_dedup_desc() {
        let formats: Vec<RawFormat> = [144, 240, 240, 720]
            .into_iter()
            .map(RawFormat::with_height)
            .collect();
        assert_eq!(collect_resolutions(&formats), vec![720, 240, 144]);
    }

    #[test]
    fn test_collect_resolutions_skips_audio_only() {
        let formats = vec![RawFormat::default(), RawFormat::with_height(0), RawFormat::with_height(360)];
        assert_eq!(collect_resolutions(&formats), vec![360]);
    }

    #[tokio::test]
    async fn test_probe_builds_video_info() {
        let eng = engine(Ok(RawVideoInfo {
            id: Some("abc".into()),
            title: Some("A clip".into()),
            thumbnail: Some("https://i.example/abc.jpg".into()),
            formats: vec![
                RawFormat::with_height(240),
                RawFormat::default(),
                RawFormat::with_height(1080),
                RawFormat::with_height(240),
            ],
            ..Default::default()
        }));

        let info = probe(&eng, "https://example.com/v/abc").await.unwrap();
        assert_eq!(info.title, "A clip");
        assert_eq!(info.thumbnail, "https://i.example/abc.jpg");
        assert_eq!(info.resolutions, vec![1080, 240]);
        assert_eq!(eng.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_playlist_result_resolves_first_entry() {
        let first = RawVideoInfo {
            id: Some("v1".into()),
            title: Some("First video".into()),
            thumbnail: Some("https://i.example/v1.jpg".into()),
            formats: vec![RawFormat::with_height(360), RawFormat::with_height(720)],
            ..Default::default()
        };
        let eng = engine(Ok(RawVideoInfo {
            id: Some("PL1".into()),
            title: Some("A playlist".into()),
            entries: vec![first, RawVideoInfo::default()],
            ..Default::default()
        }));

        let info = probe(&eng, "https://www.youtube.com/playlist?list=PL1").await.unwrap();
        assert_eq!(info.title, "First video");
        assert_eq!(info.thumbnail, "https://i.example/v1.jpg");
        assert_eq!(info.resolutions, vec![720, 360]);
    }

    #[tokio::test]
    async fn test_probe_empty_url_is_invalid() {
        let eng = engine(Ok(RawVideoInfo::default()));
        let err = probe(&eng, "   ").await.unwrap_err();
        assert!(matches!(err, VidharborError::InvalidRequest(_)));
        assert_eq!(eng.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_verbatim_and_not_retried() {
        let eng = engine(Err("ERROR: [generic] Unsupported URL".into()));
        let err = probe(&eng, "https://example.com").await.unwrap_err();
        match err {
            VidharborError::ExtractionFailed { message } => {
                assert_eq!(message, "ERROR: [generic] Unsupported URL")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(eng.calls.load(Ordering::SeqCst), 1);
    }
}
