//! Error taxonomy for the materialization layer

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// The project list or config file could not be read. Fatal at startup.
    #[error("cannot read {}: {source}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// One project failed to initialise; its registry entry is omitted.
    #[error("cannot initialise project {}: {message}", path.display())]
    ProjectInit { path: PathBuf, message: String },

    #[error("malformed request body: {0}")]
    RequestBind(String),

    #[error("unknown project: {0}")]
    UnknownProject(String),

    /// Disk probe or text read failure. Treated as a miss or as empty content.
    #[error("artifact i/o on {}: {source}", path.display())]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("drawing {kind} diagram for {name} failed: {message}")]
    Generation {
        kind: &'static str,
        name: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ViewerError>;
