//! # Tollgate Core
//!
//! Core types shared by the Tollgate policy compiler and its tooling.
//!
//! This crate provides:
//!
//! - [`SourceFile`] and [`Span`] - authored source text and locations in it
//! - [`Diagnostic`] and [`DiagnosticSink`] - recoverable compilation messages
//! - [`DocumentMarker`] and [`Section`] - what a definition compiles to
//! - [`Element`] - the output element tree
//! - [`XmlWriter`] - deterministic XML serialization
//! - [`expression`] - the inline expression marker
//!
//! ## Example
//!
//! ```rust
//! use tollgate_core::{Element, WriterOptions, XmlWriter};
//!
//! let mut inbound = Element::new("inbound");
//! inbound.add_element(Element::new("base"));
//!
//! let mut root = Element::new("policies");
//! root.add_element(inbound);
//!
//! let xml = XmlWriter::new(WriterOptions::compact()).write(&root);
//! assert_eq!(xml, "<policies><inbound><base /></inbound></policies>");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod diagnostic;
pub mod document;
pub mod error;
pub mod expression;
pub mod marker;
pub mod source;
pub mod xml;


pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink};
pub use document::{Attribute, Element, Node};
pub use error::{Error, Result};
pub use marker::{DocumentKind, DocumentMarker, Section};
pub use source::{Location, SourceFile, Span};
pub use xml::{WriterOptions, XmlWriter};
