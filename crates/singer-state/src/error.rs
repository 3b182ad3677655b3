//! State store error types.

use std::path::PathBuf;

/// Errors produced by [`StateStore`](crate::StateStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Listing, reading or writing remote objects failed.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Local staging file could not be read or written.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote store could not be configured.
    #[error("state store configuration error: {0}")]
    Config(String),
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
