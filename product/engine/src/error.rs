use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external tool is missing: {tool}")]
    ExternalToolMissing { tool: String },

    #[error("external tool failed: {tool} (code={code:?}) {stderr}")]
    ExternalToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{} not found.", .0.display())]
    WorkFileMissing(PathBuf),

    #[error("invalid metadata rule for {field}: {source}")]
    InvalidMetadataRule {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to replace {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings at {path}: {source}")]
    SettingsInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("download worker panicked: {0}")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
