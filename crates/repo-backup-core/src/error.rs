use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed timestamp file {}: {reason}", .path.display())]
    MalformedTimestampFile { path: PathBuf, reason: String },

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bucket path {} needs at least three components", .0.display())]
    InvalidBucket(PathBuf),

    #[error("Archiver failed for bucket {}: {message}", .bucket.display())]
    ArchiverInvocation { bucket: PathBuf, message: String },

    #[error("Destination is locked by another run; remove {} if it is stale", .lock_file.display())]
    DestinationLocked { lock_file: PathBuf },

    #[error("Catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    #[error("Config file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised while validating the run, before any query or
    /// filesystem mutation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::MalformedTimestampFile { .. } | Error::Config(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
