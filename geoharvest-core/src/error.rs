use geoharvest_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON encode error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Field '{0}' already exists")]
    DuplicateField(String),

    #[error("Record attribute '{0}' has no matching field")]
    UnknownField(String),

    #[error("Output path {} would be overwritten by its own sidecar file", .0.display())]
    SidecarClash(PathBuf),
}

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("HTTP client setup failed")]
    Client(#[source] ScanError),

    #[error("Fetch failed for {url}: {source}")]
    Fetch { url: String, source: ScanError },

    #[error("Malformed result node from {url}: {source}")]
    Malformed { url: String, source: ScanError },

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Cannot create output directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid search target: {0}")]
    InvalidTarget(String),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
