//! Error types shared by the calibration, age-line and image modules.
//! Library-level functions return `ChartError`; `main` wraps them with anyhow context.

use std::path::PathBuf;

/// Errors raised while building or writing chart artifacts.
#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl ChartError {
    pub fn config(msg: impl Into<String>) -> Self {
        ChartError::Configuration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChartError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ChartError> = std::result::Result<T, E>;
