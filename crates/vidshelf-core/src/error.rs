use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cannot access {}: {source}", path.display())]
    FilesystemAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot fingerprint {}: {source}", path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination already holds different content: {}", path.display())]
    Collision { path: PathBuf },

    #[error("Recursive directory structure detected: {}", path.display())]
    StructuralAnomaly { path: PathBuf },

    #[error("Refusing to {operation} {} during a dry run", path.display())]
    DryRunViolation {
        operation: &'static str,
        path: PathBuf,
    },

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FilesystemAccess {
            path: path.into(),
            source,
        }
    }
}
