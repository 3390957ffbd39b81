use std::path::PathBuf;

use serde_json::Map;

/// Supported raster extensions, in probe order. Upper-case variants are
/// listed explicitly because extension probing is an exact path check on
/// case-sensitive filesystems.
pub const IMG_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp", "JPG", "JPEG", "PNG", "BMP", "TIF",
    "TIFF", "WEBP",
];

/// Whether `ext` (without the leading dot) names a supported raster format.
pub fn is_supported_ext(ext: &str) -> bool {
    IMG_EXTS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Parsed annotation JSON. Kept as a plain object so fields this tool does
/// not know about survive a rewrite untouched.
pub type Annotation = Map<String, serde_json::Value>;

/// Outcome counters for one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolSummary {
    pub tool: String,
    pub total: usize,
    pub skipped: usize,
    pub saved_to: PathBuf,
}

impl ToolSummary {
    pub fn new(tool: &str, saved_to: PathBuf) -> Self {
        Self {
            tool: tool.to_string(),
            total: 0,
            skipped: 0,
            saved_to,
        }
    }

    pub fn log(&self) {
        log::info!(
            "Summary {}: total={} skipped={} saved_to={}",
            self.tool,
            self.total,
            self.skipped,
            self.saved_to.display()
        );
        if self.skipped > 0 {
            log::warn!(
                "{}: {} artifact(s) skipped, see log for details",
                self.tool,
                self.skipped
            );
        }
    }
}
