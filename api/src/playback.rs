/// Byte-range streaming of downloaded files for in-browser playback.
///
/// Without a `Range` header the whole file is sent with `200`. With
/// `Range: bytes=<start>-<end?>` the requested slice is sent with `206`
/// and a `Content-Range` header. Only the first range of a multi-range
/// header is honoured; anything unparsable is served as a full response.
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use vidharbor_shared::errors::{VidharborError, VidharborResult};

use crate::AppState;

/// Content type used for every played file; downloads are merged to mp4.
pub const MEDIA_CONTENT_TYPE: &str = "video/mp4";

/// How a request maps onto a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Full,
    /// Inclusive byte bounds, already clamped to the file.
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

impl RangeRequest {
    pub fn resolve(header: Option<&str>, size: u64) -> Self {
        let Some((start, end)) = header.and_then(parse_first_range) else {
            return RangeRequest::Full;
        };
        if start >= size {
            return RangeRequest::Unsatisfiable;
        }
        let last = size - 1;
        RangeRequest::Partial {
            start,
            end: end.map_or(last, |end| end.min(last)),
        }
    }
}

/// Parse `bytes=<start>-<end?>`, keeping only the first range.
fn parse_first_range(value: &str) -> Option<(u64, Option<u64>)> {
    let (unit, ranges) = value.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }
    let first = ranges.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;

    // Suffix ranges (`-N`) have no start and are not supported.
    let start: u64 = start.trim().parse().ok()?;
    let end = match end.trim() {
        "" => None,
        end => Some(end.parse::<u64>().ok()?),
    };
    if matches!(end, Some(end) if end < start) {
        return None;
    }
    Some((start, end))
}

/// Resolve `filename` strictly inside `download_dir`.
///
/// Traversal attempts, symlinks pointing outside the directory, and anything
/// that is not an existing regular file are all `NotFound`.
pub async fn resolve_media_path(download_dir: &Path, filename: &str) -> VidharborResult<PathBuf> {
    let missing = || VidharborError::NotFound(filename.to_string());

    if filename.is_empty()
        || Path::new(filename)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(missing());
    }

    let root = tokio::fs::canonicalize(download_dir)
        .await
        .map_err(|_| missing())?;
    let path = tokio::fs::canonicalize(root.join(filename))
        .await
        .map_err(|_| missing())?;
    if !path.starts_with(&root) {
        return Err(missing());
    }

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => Ok(path),
        _ => Err(missing()),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}

fn read_error(path: &Path, e: std::io::Error) -> Response {
    warn!("Failed to read {}: {}", path.display(), e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response()
}

/// Build the full or partial response for an already resolved file.
pub async fn serve_file(path: &Path, range_header: Option<&str>) -> Response {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return not_found(),
    };
    let size = match file.metadata().await {
        Ok(m) => m.len(),
        Err(e) => return read_error(path, e),
    };

    match RangeRequest::resolve(range_header, size) {
        RangeRequest::Full => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, MEDIA_CONTENT_TYPE.to_string()),
                (header::CONTENT_LENGTH, size.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response(),

        RangeRequest::Partial { start, end } => {
            if let Err(e) = file.seek(std::io::SeekFrom::Start(start)).await {
                return read_error(path, e);
            }
            let length = end - start + 1;
            debug!("Serving bytes {}-{}/{} of {}", start, end, size, path.display());
            (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, MEDIA_CONTENT_TYPE.to_string()),
                    (header::CONTENT_LENGTH, length.to_string()),
                    (header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, size)),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                Body::from_stream(ReaderStream::new(file.take(length))),
            )
                .into_response()
        }

        RangeRequest::Unsatisfiable => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [
                (header::CONTENT_RANGE, format!("bytes */{}", size)),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
        )
            .into_response(),
    }
}

/// GET /play/*filename
pub async fn play_file(
    State(state): State<Arc<AppState>>,
    UrlPath(filename): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    let path = match resolve_media_path(&state.config.download_dir, &filename).await {
        Ok(path) => path,
        Err(e) => {
            debug!("Playback request for unknown file {:?}: {}", filename, e);
            return not_found();
        }
    };

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    serve_file(&path, range).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn media_file(dir: &Path) -> (PathBuf, Vec<u8>) {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let path = dir.join("Clip [abc].mp4");
        std::fs::write(&path, &data).unwrap();
        (path, data)
    }

    #[test]
    fn test_resolve_bounded_range() {
        assert_eq!(
            RangeRequest::resolve(Some("bytes=100-199"), 1000),
            RangeRequest::Partial { start: 100, end: 199 }
        );
    }

    #[test]
    fn test_resolve_open_ended_range() {
        assert_eq!(
            RangeRequest::resolve(Some("bytes=900-"), 1000),
            RangeRequest::Partial { start: 900, end: 999 }
        );
    }

    #[test]
    fn test_resolve_clamps_end_to_file() {
        assert_eq!(
            RangeRequest::resolve(Some("bytes=500-5000"), 1000),
            RangeRequest::Partial { start: 500, end: 999 }
        );
    }

    #[test]
    fn test_resolve_multi_range_uses_first() {
        assert_eq!(
            RangeRequest::resolve(Some("bytes=0-9, 20-29"), 1000),
            RangeRequest::Partial { start: 0, end: 9 }
        );
    }

    #[test]
    fn test_resolve_malformed_is_full() {
        for header in ["bytes=abc-", "bytes=-500", "items=0-10", "bytes=50-10", "bytes", ""] {
            assert_eq!(RangeRequest::resolve(Some(header), 1000), RangeRequest::Full, "{header}");
        }
        assert_eq!(RangeRequest::resolve(None, 1000), RangeRequest::Full);
    }

    #[test]
    fn test_resolve_start_past_end() {
        assert_eq!(
            RangeRequest::resolve(Some("bytes=1000-"), 1000),
            RangeRequest::Unsatisfiable
        );
        assert_eq!(RangeRequest::resolve(Some("bytes=0-"), 0), RangeRequest::Unsatisfiable);
    }

    #[tokio::test]
    async fn test_serve_partial() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = media_file(dir.path());

        let response = serve_file(&path, Some("bytes=100-199")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), Some("bytes 100-199/1000"));
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("100"));
        assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("video/mp4"));
        assert_eq!(body_bytes(response).await, data[100..200].to_vec());
    }

    #[tokio::test]
    async fn test_serve_open_ended() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = media_file(dir.path());

        let response = serve_file(&path, Some("bytes=900-")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), Some("bytes 900-999/1000"));
        assert_eq!(body_bytes(response).await, data[900..].to_vec());
    }

    #[tokio::test]
    async fn test_serve_full() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = media_file(dir.path());

        let response = serve_file(&path, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
        assert_eq!(header_str(&response, header::ACCEPT_RANGES), Some("bytes"));
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn test_serve_unsatisfiable() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = media_file(dir.path());

        let response = serve_file(&path, Some("bytes=4000-")).await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), Some("bytes */1000"));
    }

    #[tokio::test]
    async fn test_resolve_media_path_rejects_escape() {
        let root = tempfile::tempdir().unwrap();
        let downloads = root.path().join("downloads");
        std::fs::create_dir(&downloads).unwrap();
        std::fs::write(root.path().join("secret.txt"), b"nope").unwrap();
        media_file(&downloads);

        assert!(resolve_media_path(&downloads, "Clip [abc].mp4").await.is_ok());
        for name in ["../secret.txt", "/etc/passwd", "missing.mp4", ""] {
            assert!(
                matches!(
                    resolve_media_path(&downloads, name).await,
                    Err(VidharborError::NotFound(_))
                ),
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn test_directory_is_not_playable() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("nested")).unwrap();

        let err = resolve_media_path(root.path(), "nested").await.unwrap_err();
        assert!(matches!(err, VidharborError::NotFound(ref name) if name == "nested"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_media_path_rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let downloads = root.path().join("downloads");
        std::fs::create_dir(&downloads).unwrap();
        std::fs::write(root.path().join("secret.txt"), b"nope").unwrap();
        std::os::unix::fs::symlink(root.path().join("secret.txt"), downloads.join("link.mp4")).unwrap();

        assert!(matches!(
            resolve_media_path(&downloads, "link.mp4").await,
            Err(VidharborError::NotFound(_))
        ));
    }
}
