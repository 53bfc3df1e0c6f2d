//! # Tollgate Compiler
//!
//! Compiles class-based policy definitions into gateway policy documents.
//!
//! This crate provides:
//!
//! - [`syntax`] - lexer, parser and syntax tree of the authoring language
//! - [`semantic`] - constant and referenced-code resolution across files
//! - [`initializer`] - configuration values extracted from expressions
//! - [`handlers`] - one policy handler per supported operation
//! - [`statements`] and [`block`] - statement dispatch by kind
//! - [`document`] - marker discovery and section assembly
//! - [`Compiler`] - the entry point tying them together
//!
//! Problems in policy code never abort compilation. They are collected as
//! [`tollgate_core::Diagnostic`]s next to each document, and whatever could be
//! compiled is still returned.
//!
//! ## Example
//!
//! ```rust
//! use tollgate_compiler::Compiler;
//! use tollgate_core::SourceFile;
//!
//! let documents = Compiler::default().compile_sources(vec![SourceFile::new(
//!     "Loop.cs",
//!     r#"[Document]
//!     class Loop
//!     {
//!         void Inbound(IInboundContext context)
//!         {
//!             while (true) { }
//!             context.SetMethod("GET");
//!         }
//!     }"#,
//! )])?;
//!
//! let document = &documents[0];
//! assert_eq!(document.diagnostics.len(), 1);
//! assert_eq!(
//!     document.diagnostics[0].message,
//!     "WhileStatement is not supported"
//! );
//! assert!(document.root.element("inbound").unwrap().element("set-method").is_some());
//! # Ok::<(), tollgate_compiler::CompilerError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod block;
pub mod compiler;
pub mod context;
pub mod document;
pub mod error;
pub mod handlers;
pub mod initializer;
pub mod semantic;
pub mod statements;
pub mod syntax;

#[cfg(test)]
mod proptest_tests;
#[cfg(test)]
mod testing;

pub use compiler::{CompiledDocument, Compiler, CompilerOptions};
pub use error::{CompilerError, Result};
