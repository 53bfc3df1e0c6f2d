//! Compilation entry point.
//!
//! [`Compiler`] parses sources, builds one [`SemanticModel`] over all of
//! them, and compiles every marked class into a [`CompiledDocument`]. Each
//! document has its own diagnostic sink, so the result of one document never
//! depends on problems found in another.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use tollgate_core::{
    Diagnostic, DiagnosticSink, DocumentMarker, Element, SourceFile, WriterOptions, XmlWriter,
};

use crate::document::{read_marker, DocumentCompiler};
use crate::error::Result;
use crate::semantic::SemanticModel;
use crate::syntax::{parse, SyntaxTree};

/// Options for compilation and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Write indented XML.
    pub format: bool,
    /// Spaces per indentation level when formatting.
    pub indent: usize,
    /// Treat any diagnostic as a failed compilation.
    pub fail_on_diagnostics: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            format: false,
            indent: 4,
            fail_on_diagnostics: true,
        }
    }
}

impl CompilerOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables indented output.
    #[must_use]
    pub const fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    /// Sets the indent width.
    #[must_use]
    pub const fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets whether diagnostics fail the compilation.
    #[must_use]
    pub const fn with_fail_on_diagnostics(mut self, fail: bool) -> Self {
        self.fail_on_diagnostics = fail;
        self
    }

    /// XML writer options matching these options.
    #[must_use]
    pub fn writer_options(&self) -> WriterOptions {
        if self.format {
            WriterOptions::indented().with_indent_width(self.indent)
        } else {
            WriterOptions::compact()
        }
    }
}

/// One compiled document and the diagnostics reported while compiling it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledDocument {
    /// Marker read from the class.
    pub marker: DocumentMarker,
    /// Name of the class the document was compiled from.
    pub class_name: String,
    /// Name of the file declaring the marker.
    pub source: String,
    /// Root element.
    pub root: Element,
    /// Diagnostics in report order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledDocument {
    /// Returns true if no diagnostics were reported.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Serializes the root element.
    #[must_use]
    pub fn to_xml(&self, options: WriterOptions) -> String {
        XmlWriter::new(options).write(&self.root)
    }
}

/// Compiles policy definitions.
///
/// # Example
///
/// ```rust
/// use tollgate_compiler::{Compiler, CompilerOptions};
/// use tollgate_core::SourceFile;
///
/// let source = SourceFile::new(
///     "Echo.cs",
///     r#"[Document("echo")]
///     public class Echo : IDocument
///     {
///         public void Inbound(IInboundContext context)
///         {
///             context.SetHeader("X-Echo", "true");
///         }
///     }"#,
/// );
///
/// let compiler = Compiler::new(CompilerOptions::default());
/// let documents = compiler.compile_sources(vec![source])?;
/// assert_eq!(documents.len(), 1);
/// assert!(documents[0].is_clean());
/// assert_eq!(
///     compiler.to_xml(&documents[0]),
///     r#"<policies><inbound><set-header name="X-Echo" exists-action="override"><value>true</value></set-header></inbound></policies>"#
/// );
/// # Ok::<(), tollgate_compiler::CompilerError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Creates a compiler.
    #[must_use]
    pub const fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Options of this compiler.
    #[must_use]
    pub const fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles every marked class of the given trees, in source order.
    #[must_use]
    pub fn compile(&self, trees: &[SyntaxTree]) -> Vec<CompiledDocument> {
        let model = SemanticModel::new(trees);
        let compiler = DocumentCompiler::new(&model);
        let mut compiled = HashSet::new();
        let mut documents = Vec::new();

        for class in model.classes() {
            if compiled.contains(class.class.name.as_str()) {
                continue;
            }
            let diagnostics = DiagnosticSink::new();
            let Some((part, marker)) = model
                .class_parts(&class.class.name)
                .iter()
                .find_map(|part| read_marker(&model, *part, &diagnostics).map(|m| (part, m)))
            else {
                continue;
            };
            compiled.insert(class.class.name.as_str());

            let root = compiler.compile(&class.class.name, &marker, &diagnostics);
            let document = CompiledDocument {
                class_name: class.class.name.clone(),
                source: part.tree.file.name().to_string(),
                marker,
                root,
                diagnostics: diagnostics.into_vec(),
            };
            if document.is_clean() {
                debug!(document = %document.marker.name, source = %document.source, "Compiled document");
            } else {
                warn!(
                    document = %document.marker.name,
                    diagnostics = document.diagnostics.len(),
                    "Document compiled with diagnostics"
                );
            }
            documents.push(document);
        }

        info!(files = trees.len(), documents = documents.len(), "Compilation finished");
        documents
    }

    /// Parses and compiles in-memory sources.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::ParseError`](crate::CompilerError::ParseError)
    /// when a source cannot be parsed.
    pub fn compile_sources(&self, sources: Vec<SourceFile>) -> Result<Vec<CompiledDocument>> {
        let trees = sources.into_iter().map(parse).collect::<Result<Vec<_>>>()?;
        Ok(self.compile(&trees))
    }

    /// Reads, parses and compiles source files.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::CoreError`](crate::CompilerError::CoreError)
    /// when a file cannot be read and
    /// [`CompilerError::ParseError`](crate::CompilerError::ParseError) when it
    /// cannot be parsed.
    pub fn compile_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<CompiledDocument>> {
        let sources = paths
            .iter()
            .map(SourceFile::load)
            .collect::<tollgate_core::Result<Vec<_>>>()?;
        self.compile_sources(sources)
    }

    /// Writes a document to `<dir>/<name>.xml` and returns the path.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::CoreError`](crate::CompilerError::CoreError)
    /// when the file cannot be written.
    pub fn write(&self, document: &CompiledDocument, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.xml", document.marker.name));
        XmlWriter::new(self.options.writer_options()).write_file(&document.root, &path)?;
        debug!(document = %document.marker.name, path = %path.display(), "Wrote document");
        Ok(path)
    }

    /// Serializes a document with this compiler's output options.
    #[must_use]
    pub fn to_xml(&self, document: &CompiledDocument) -> String {
        document.to_xml(self.options.writer_options())
    }

    /// Returns true if the documents count as a failed compilation.
    #[must_use]
    pub fn has_failed(&self, documents: &[CompiledDocument]) -> bool {
        self.options.fail_on_diagnostics && documents.iter().any(|d| !d.is_clean())
    }
}
