//! Error type for the engine's outer surfaces.
//!
//! The per-sample update paths never fail: bad input degrades to "hold last
//! good state". Errors only exist where the engine touches the outside world
//! (config files, JSON, the runner's channel).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DrError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session runner has shut down")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, DrError>;
