//! Error types for the Tollgate compiler.
//!
//! Problems inside policy code are reported as diagnostics, never as errors.
//! [`CompilerError`] covers what prevents compilation from starting or its
//! output from being written: file system failures and source text too broken
//! to build a syntax tree from.

use thiserror::Error;

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Errors that can occur before policy compilation begins.
#[derive(Error, Debug)]
pub enum CompilerError {
    /// Source text could not be parsed into a syntax tree.
    #[error("Syntax error in {file} at line {line}, column {column}: {message}")]
    ParseError {
        /// File being parsed.
        file: String,
        /// Line number of the error.
        line: u32,
        /// Column number of the error.
        column: u32,
        /// Error message.
        message: String,
    },

    /// Core library error.
    #[error(transparent)]
    CoreError(#[from] tollgate_core::Error),
}
