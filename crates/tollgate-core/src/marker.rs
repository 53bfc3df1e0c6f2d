//! Document markers and lifecycle sections.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a definition compiles to a full policy document or a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// A complete policy document with lifecycle sections.
    Document,
    /// A reusable fragment with a single generic section.
    Fragment,
}

impl DocumentKind {
    /// Name of the root element emitted for this kind.
    #[must_use]
    pub const fn root_element(&self) -> &'static str {
        match self {
            Self::Document => "policies",
            Self::Fragment => "fragment",
        }
    }
}

/// Metadata read from the marker attribute of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMarker {
    /// Output document name.
    pub name: String,
    /// Scope the document applies to (e.g. `api`, `product`).
    pub scope: String,
    /// Document or fragment.
    pub kind: DocumentKind,
}

impl DocumentMarker {
    /// Default scope when the marker does not declare one.
    pub const DEFAULT_SCOPE: &'static str = "any";

    /// Creates a marker with the default scope.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            name: name.into(),
            scope: Self::DEFAULT_SCOPE.to_string(),
            kind,
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// A lifecycle phase of request processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    /// Request on its way in.
    Inbound,
    /// Forwarding to the backend.
    Backend,
    /// Response on its way out.
    Outbound,
    /// Error handling.
    OnError,
    /// Body of a fragment.
    Fragment,
}

impl Section {
    /// Sections available to full documents.
    pub const DOCUMENT_SECTIONS: [Self; 4] = [Self::Inbound, Self::Backend, Self::Outbound, Self::OnError];

    /// Maps a lifecycle method name to its section for the given document kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tollgate_core::{DocumentKind, Section};
    ///
    /// assert_eq!(Section::from_method_name("OnError", DocumentKind::Document), Some(Section::OnError));
    /// assert_eq!(Section::from_method_name("Fragment", DocumentKind::Document), None);
    /// assert_eq!(Section::from_method_name("Fragment", DocumentKind::Fragment), Some(Section::Fragment));
    /// ```
    #[must_use]
    pub fn from_method_name(name: &str, kind: DocumentKind) -> Option<Self> {
        match (kind, name) {
            (DocumentKind::Document, "Inbound") => Some(Self::Inbound),
            (DocumentKind::Document, "Backend") => Some(Self::Backend),
            (DocumentKind::Document, "Outbound") => Some(Self::Outbound),
            (DocumentKind::Document, "OnError") => Some(Self::OnError),
            (DocumentKind::Fragment, "Fragment") => Some(Self::Fragment),
            _ => None,
        }
    }

    /// Element name of the section in the output document.
    #[must_use]
    pub const fn element_name(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Backend => "backend",
            Self::Outbound => "outbound",
            Self::OnError => "on-error",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}
