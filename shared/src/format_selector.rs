/// Format selection policy passed to the download engine.
///
/// The selector is a yt-dlp format expression with three alternatives,
/// tried left to right:
///
/// 1. `bestvideo[height<=N]+bestaudio` - separate streams capped at the
///    requested height, merged afterwards.
/// 2. `best[ext=mp4]` - best pre-muxed stream in the target container.
/// 3. `best` - whatever the engine considers best.
use std::fmt;

/// Container every download is merged into.
pub const TARGET_CONTAINER: &str = "mp4";

/// Immutable selector built from a requested resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelector(String);

impl FormatSelector {
    /// Build the fallback chain for `resolution` (vertical pixels).
    pub fn build(resolution: u32) -> Self {
        FormatSelector(format!(
            "bestvideo[height<={res}]+bestaudio/best[ext={ext}]/best",
            res = resolution,
            ext = TARGET_CONTAINER,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
