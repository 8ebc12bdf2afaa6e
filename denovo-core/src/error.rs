use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DenovoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job for chunk {} failed: {message}", chunk.display())]
    Job { chunk: PathBuf, message: String },
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, DenovoError>;
