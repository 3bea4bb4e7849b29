/// Process-wide configuration, read once from the environment at startup.
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub download_dir: PathBuf,
    pub history_path: PathBuf,
    pub ytdlp_bin: String,
    pub ffmpeg_location: Option<String>,
    pub max_concurrent_downloads: usize,
    pub probe_timeout_secs: u64,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Self {
            api_host: string("API_HOST", "127.0.0.1"),
            api_port: parse_or(get("API_PORT"), 5000),
            download_dir: PathBuf::from(string("DOWNLOAD_DIR", "./downloads")),
            history_path: PathBuf::from(string("HISTORY_PATH", "./download_history.json")),
            ytdlp_bin: string("YTDLP_BIN", "yt-dlp"),
            ffmpeg_location: get("FFMPEG_LOCATION").filter(|v| !v.is_empty()),
            max_concurrent_downloads: parse_or(get("MAX_CONCURRENT_DOWNLOADS"), 3),
            probe_timeout_secs: parse_or(get("PROBE_TIMEOUT_SECS"), 120),
            static_dir: get("STATIC_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

/// Parse an optional value, falling back to `default` when absent or invalid.
fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
