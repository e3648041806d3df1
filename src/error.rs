use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No beatmap files found in {0}")]
    NoBeatmaps(PathBuf),

    #[error("Beatmap is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),

    #[error("Analysis worker panicked")]
    WorkerPanicked,

    #[error("Config parse error in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
