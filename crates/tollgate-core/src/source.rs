//! Source files and spans.
//!
//! Every syntax node and diagnostic points back into a [`SourceFile`] through
//! a [`Span`]. Spans are byte ranges with the 1-based line and column of their
//! first byte cached so that diagnostics never need to rescan the text.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A byte range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first byte.
    pub start: u32,
    /// Byte offset one past the last byte.
    pub end: u32,
    /// Line of the first byte (1-based).
    pub line: u32,
    /// Column of the first byte (1-based, in bytes).
    pub column: u32,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: u32, end: u32, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Returns a span covering both `self` and `other`.
    ///
    /// The line and column are taken from whichever span starts first.
    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        let (first, end) = if self.start <= other.start {
            (self, other.end)
        } else {
            (other, self.end)
        };
        let end = if end > first.end { end } else { first.end };
        Self::new(first.start, end, first.line, first.column)
    }

    /// Length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resolved position used when reporting diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File the location refers to.
    pub file: String,
    /// Line number (1-based).
    pub line: u32,
    /// Column number (1-based).
    pub column: u32,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.file, self.line, self.column)
    }
}

/// An authored source file held in memory for one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    path: Option<PathBuf>,
    text: String,
}

impl SourceFile {
    /// Creates a source file from text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tollgate_core::SourceFile;
    ///
    /// let file = SourceFile::new("Echo.cs", "class Echo {}");
    /// assert_eq!(file.name(), "Echo.cs");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            text: text.into(),
        }
    }

    /// Creates a source file remembering the path it was read from.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.to_string_lossy().into_owned(),
            path: Some(path),
            text: text.into(),
        }
    }

    /// Reads a source file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceLoadError`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::SourceLoadError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_path(path, text))
    }

    /// Display name of the file.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the file was loaded from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Full source text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the text covered by `span`, or an empty string when the span
    /// falls outside the file.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        self.text
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }

    /// Resolves a span to a reportable location.
    #[must_use]
    pub fn location(&self, span: Span) -> Location {
        Location::new(&self.name, span.line, span.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_to_merges_ranges() {
        let a = Span::new(4, 8, 1, 5);
        let b = Span::new(10, 20, 2, 3);

        assert_eq!(a.to(b), Span::new(4, 20, 1, 5));
        assert_eq!(b.to(a), Span::new(4, 20, 1, 5));
    }

    #[test]
    fn test_slice_and_location() {
        let file = SourceFile::new("Echo.cs", "class Echo {}");
        let span = Span::new(6, 10, 1, 7);

        assert_eq!(file.slice(span), "Echo");
        assert_eq!(file.location(span).to_string(), "Echo.cs(1,7)");
    }

    #[test]
    fn test_slice_out_of_range_is_empty() {
        let file = SourceFile::new("a.cs", "abc");
        assert_eq!(file.slice(Span::new(2, 10, 1, 3)), "");
    }

    #[test]
    fn test_load_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Echo.cs");
        std::fs::write(&path, "class Echo {}").unwrap();

        let file = SourceFile::load(&path).unwrap();
        assert_eq!(file.text(), "class Echo {}");
        assert_eq!(file.path(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SourceFile::load("/nonexistent/Echo.cs");
        assert!(matches!(result, Err(Error::SourceLoadError { .. })));
    }

    #[test]
    fn test_with_path_uses_path_as_name() {
        let file = SourceFile::with_path("policies/Echo.cs", "");
        assert_eq!(file.name(), "policies/Echo.cs");
        assert_eq!(file.path(), Some(Path::new("policies/Echo.cs")));
    }
}
