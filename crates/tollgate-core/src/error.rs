//! Error types for Tollgate core operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Tollgate core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A source file could not be loaded.
    #[error("Failed to load source from {}: {source}", path.display())]
    SourceLoadError {
        /// Path to the source file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document could not be written.
    #[error("Failed to write document to {}: {source}", path.display())]
    DocumentWriteError {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
