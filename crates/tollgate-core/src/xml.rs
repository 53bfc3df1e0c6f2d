//! Deterministic XML serialization of policy documents.
//!
//! Plain values are escaped; values carrying the inline expression marker are
//! written raw with the marker removed. Indented and compact output differ
//! only in whitespace.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::{Element, Node};
use crate::error::{Error, Result};
use crate::expression::strip_marker;

/// Options controlling serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterOptions {
    /// Whether to put each element on its own indented line.
    pub indent: bool,
    /// Spaces per indentation level.
    pub indent_width: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_width: 4,
        }
    }
}

impl WriterOptions {
    /// Compact output without insignificant whitespace.
    #[must_use]
    pub fn compact() -> Self {
        Self::default()
    }

    /// Indented output with the default indent width.
    #[must_use]
    pub fn indented() -> Self {
        Self {
            indent: true,
            ..Self::default()
        }
    }

    /// Sets the indent width.
    #[must_use]
    pub const fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }
}

/// Serializes an element tree to XML text.
///
/// # Examples
///
/// ```rust
/// use tollgate_core::{Element, WriterOptions, XmlWriter};
///
/// let root = Element::new("set-method").with_text("GET");
/// let xml = XmlWriter::new(WriterOptions::compact()).write(&root);
/// assert_eq!(xml, "<set-method>GET</set-method>");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlWriter {
    options: WriterOptions,
}

impl XmlWriter {
    /// Creates a writer.
    #[must_use]
    pub const fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    /// Serializes `root` and everything below it.
    #[must_use]
    pub fn write(&self, root: &Element) -> String {
        let mut out = String::new();
        self.write_element(&mut out, root, 0);
        out
    }

    /// Serializes `root` into the file at `path`, replacing it if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentWriteError`] if the file cannot be written.
    pub fn write_file(&self, root: &Element, path: &Path) -> Result<()> {
        std::fs::write(path, self.write(root)).map_err(|source| Error::DocumentWriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_element(&self, out: &mut String, element: &Element, depth: usize) {
        self.write_indent(out, depth);
        out.push('<');
        out.push_str(&element.name);
        for attribute in &element.attributes {
            out.push(' ');
            out.push_str(&attribute.name);
            out.push_str("=\"");
            match strip_marker(&attribute.value) {
                Some(raw) => out.push_str(raw),
                None => escape_into(out, &attribute.value, true),
            }
            out.push('"');
        }

        if element.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');

        let inline = !self.options.indent
            || element
                .children
                .iter()
                .all(|child| !matches!(child, Node::Element(_)));

        for child in &element.children {
            match child {
                Node::Element(nested) => {
                    if self.options.indent {
                        out.push('\n');
                    }
                    self.write_element(out, nested, depth + 1);
                }
                Node::Text(text) => {
                    if !inline {
                        out.push('\n');
                        self.write_indent(out, depth + 1);
                    }
                    match strip_marker(text) {
                        Some(raw) => out.push_str(raw),
                        None => escape_into(out, text, false),
                    }
                }
                Node::Raw(markup) => {
                    if !inline {
                        out.push('\n');
                        self.write_indent(out, depth + 1);
                    }
                    out.push_str(markup);
                }
            }
        }

        if !inline {
            out.push('\n');
            self.write_indent(out, depth);
        }
        out.push_str("</");
        out.push_str(&element.name);
        out.push('>');
    }

    fn write_indent(&self, out: &mut String, depth: usize) {
        if self.options.indent {
            out.push_str(&" ".repeat(depth * self.options.indent_width));
        }
    }
}

fn escape_into(out: &mut String, value: &str, attribute: bool) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}
