use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to parse repository {url}: {reason}")]
    InvalidRepository { url: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
