/// Vidharbor core: probing, format selection, download orchestration and
/// the download history.
pub mod download_queue;
pub mod engine;
pub mod errors;
pub mod format_selector;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod resolver;
