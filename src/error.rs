use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing a dataset.
///
/// `NotFound`, `Decode` and `Transform` are per-artifact conditions: the
/// pipeline catches them at the artifact boundary, counts a skip and moves
/// on. `Config` errors are fatal and abort a run before any output is
/// written.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("no image found for `{0}`")]
    NotFound(String),

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, PrepError>;
