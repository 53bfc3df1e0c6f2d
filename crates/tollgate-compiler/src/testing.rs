//! Helpers for compiling small inbound sections in unit tests.

use tollgate_core::{Diagnostic, Element, SourceFile, WriterOptions, XmlWriter};

use crate::compiler::Compiler;

/// Compiles `statements` as the inbound section of a test document.
///
/// `members` is inserted before the section method on one line, so the first
/// statement is always on line 7 of `TestPolicy.cs`.
pub(crate) fn compile_inbound(statements: &str, members: &str) -> (Element, Vec<Diagnostic>) {
    let members = members.replace('\n', " ");
    let text = format!(
        "[Document]\nclass TestPolicy\n{{\n{members}\npublic void Inbound(IInboundContext context)\n{{\n{statements}\n}}\n}}\n"
    );
    let documents = Compiler::default()
        .compile_sources(vec![SourceFile::new("TestPolicy.cs", text)])
        .expect("test source parses");
    let document = documents.into_iter().next().expect("one document");
    let inbound = document
        .root
        .element("inbound")
        .cloned()
        .expect("inbound section");
    (inbound, document.diagnostics)
}

/// Compiles `statements` and returns the compact XML of the inbound section.
///
/// Panics if any diagnostic was reported.
pub(crate) fn inbound_xml(statements: &str) -> String {
    let (inbound, diagnostics) = compile_inbound(statements, "");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    XmlWriter::new(WriterOptions::compact()).write(&inbound)
}
