//! Compilation diagnostics.
//!
//! A [`Diagnostic`] is a recoverable, located message. Compilers never abort
//! on one: they report it to the shared [`DiagnosticSink`], substitute a safe
//! default and continue with the next statement.

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::Location;

/// Category of a diagnostic, with a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Statement kind has no registered compiler.
    UnsupportedStatement,
    /// Expression has a shape the compiler cannot translate.
    UnsupportedExpression,
    /// Called operation has no policy handler.
    MethodNotSupported,
    /// Operation called with the wrong number of arguments.
    ArgumentCountMismatch,
    /// Argument must be an object creation expression.
    ArgumentNotObjectCreation,
    /// Object creation has the wrong configuration type.
    ArgumentTypeMismatch,
    /// A required configuration field is missing.
    RequiredParameterMissing,
    /// More than one of a set of mutually exclusive fields was supplied.
    OnlyOneOfAllowed,
    /// None of a set of alternative fields was supplied.
    AtLeastOneOfRequired,
    /// Referenced symbol is not a compile-time constant.
    NotConstant,
    /// Referenced code could not be located.
    CannotResolveReferencedCode,
    /// Lifecycle method has no block body.
    EmptySection,
    /// Configuration value has a shape that cannot be extracted.
    ParameterNotSupported,
    /// Lifecycle method defined more than once.
    DuplicateSection,
    /// Statement could not be parsed.
    InvalidSyntax,
}

impl DiagnosticCode {
    /// Returns the stable identifier, e.g. `TG1001`.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::UnsupportedStatement => "TG1001",
            Self::UnsupportedExpression => "TG1002",
            Self::MethodNotSupported => "TG1003",
            Self::ArgumentCountMismatch => "TG1004",
            Self::ArgumentNotObjectCreation => "TG1005",
            Self::ArgumentTypeMismatch => "TG1006",
            Self::RequiredParameterMissing => "TG1007",
            Self::OnlyOneOfAllowed => "TG1008",
            Self::AtLeastOneOfRequired => "TG1009",
            Self::NotConstant => "TG1010",
            Self::CannotResolveReferencedCode => "TG1011",
            Self::EmptySection => "TG1012",
            Self::ParameterNotSupported => "TG1013",
            Self::DuplicateSection => "TG1014",
            Self::InvalidSyntax => "TG1015",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A located compilation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Category of the diagnostic.
    pub code: DiagnosticCode,
    /// Where the problem was found.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    #[must_use]
    pub fn new(code: DiagnosticCode, location: Location, message: impl Into<String>) -> Self {
        Self {
            code,
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error {}: {}", self.location, self.code, self.message)
    }
}

/// Append-only diagnostic log shared by every context of one compilation unit.
///
/// Child contexts borrow the same sink, so a diagnostic reported while
/// compiling a nested branch lands in the document's single ordered list.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        self.entries.borrow_mut().push(diagnostic);
    }

    /// Number of diagnostics reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Copies the diagnostics reported so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Consumes the sink, returning its diagnostics in report order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_inner()
    }
}
