/// Vidharbor API Server
///
/// Probes remote videos, downloads and merges them through yt-dlp, keeps a
/// download history, and streams finished files back with range support.
mod config;
mod error;
mod playback;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use vidharbor_shared::download_queue::DownloadQueue;
use vidharbor_shared::engine::{MediaEngine, YtDlpEngine};
use vidharbor_shared::history::HistoryStore;
use vidharbor_shared::orchestrator::Orchestrator;

use config::Config;

/// Shared application state for all API handlers.
pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub queue: DownloadQueue,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn MediaEngine>) -> Self {
        let history = Arc::new(HistoryStore::new(&config.history_path));
        let orchestrator = Arc::new(Orchestrator::new(engine, history, &config.download_dir));
        let queue = DownloadQueue::new(config.max_concurrent_downloads);
        Self {
            config,
            orchestrator,
            queue,
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/get_video_info", post(routes::get_video_info))
        .route("/download_video", post(routes::download_video))
        .route("/history", get(routes::history))
        .route("/play/*filename", get(playback::play_file))
        .route("/health", get(routes::health));

    // Front-end page and assets
    if let Some(static_dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vidharbor_api=info,vidharbor_shared=info,tower_http=info".into()
            }),
        )
        .init();

    let config = Config::from_env();

    // Ensure download directory exists
    std::fs::create_dir_all(&config.download_dir)?;
    info!("Download directory: {}", config.download_dir.display());
    info!("History file: {}", config.history_path.display());

    let engine = YtDlpEngine::new(&config.ytdlp_bin)
        .with_ffmpeg_location(config.ffmpeg_location.clone())
        .with_probe_timeout(Duration::from_secs(config.probe_timeout_secs));

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, Arc::new(engine)));

    // Background cleanup of finished download jobs
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_state.queue.cleanup_old(3600).await;
        }
    });

    let app = build_router(state);

    info!("Vidharbor API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
