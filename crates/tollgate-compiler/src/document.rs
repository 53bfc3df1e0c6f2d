//! Document discovery and section assembly.
//!
//! A class carrying `[Document]` or `[Fragment]` compiles to one output
//! document. Each method named after a lifecycle section contributes that
//! section; other methods are helper code and are ignored. Sections are
//! emitted in the source order of their methods, across partial class parts.

use std::collections::BTreeSet;

use tracing::debug;
use tollgate_core::{
    Diagnostic, DiagnosticCode, DiagnosticSink, DocumentKind, DocumentMarker, Element, Section,
};

use crate::block::BlockCompiler;
use crate::context::{CompilationContext, VariableBindings};
use crate::semantic::{ClassRef, SemanticModel};
use crate::syntax::{Expr, MethodBody};

/// Reads the document marker of a class, if it carries one.
///
/// Names that are not compile-time constants, or that are not plain file
/// names, are reported and replaced by the class name.
#[must_use]
pub fn read_marker(
    model: &SemanticModel<'_>,
    class: ClassRef<'_>,
    diagnostics: &DiagnosticSink,
) -> Option<DocumentMarker> {
    let (attribute, kind) = class.class.attributes.iter().find_map(|attribute| {
        match attribute.simple_name() {
            "Document" => Some((attribute, DocumentKind::Document)),
            "Fragment" => Some((attribute, DocumentKind::Fragment)),
            _ => None,
        }
    })?;

    let reader = MarkerReader {
        model,
        class,
        diagnostics,
    };
    let mut name = None;
    let mut scope = None;
    for argument in &attribute.arguments {
        match argument.name.as_deref() {
            None | Some("Name") => {
                name = reader.text(&argument.value).and_then(|text| reader.file_name(text, &argument.value));
            }
            Some("Scope") => scope = reader.scope(&argument.value),
            Some(_) => {}
        }
    }

    let name = name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| class.class.name.clone());
    let marker = DocumentMarker::new(name, kind);
    Some(match scope {
        Some(scope) => marker.with_scope(scope),
        None => marker,
    })
}

struct MarkerReader<'m, 'a> {
    model: &'m SemanticModel<'a>,
    class: ClassRef<'a>,
    diagnostics: &'m DiagnosticSink,
}

impl MarkerReader<'_, '_> {
    fn text(&self, value: &Expr) -> Option<String> {
        match self.model.evaluate_constant(&self.class.class.name, value) {
            Ok(text) => Some(text),
            Err(error) => {
                let location = self.class.tree.file.location(value.span());
                self.diagnostics.report(Diagnostic::new(
                    DiagnosticCode::NotConstant,
                    location,
                    format!("Document name: {error}"),
                ));
                None
            }
        }
    }

    /// The name becomes `<name>.xml` in the output directory, so it must not
    /// name another directory.
    fn file_name(&self, name: String, value: &Expr) -> Option<String> {
        let dots_only = !name.is_empty() && name.chars().all(|c| c == '.');
        if !dots_only && !name.contains(['/', '\\']) {
            return Some(name);
        }
        let location = self.class.tree.file.location(value.span());
        self.diagnostics.report(Diagnostic::new(
            DiagnosticCode::ParameterNotSupported,
            location,
            format!("Document name '{name}' must not contain path separators or be a relative directory"),
        ));
        None
    }

    /// `DocumentScope.Api` reads as `api`; constants and literals are lowercased.
    fn scope(&self, value: &Expr) -> Option<String> {
        if let Expr::MemberAccess { name, .. } = value {
            if self.model.evaluate_constant(&self.class.class.name, value).is_err() {
                return Some(name.to_lowercase());
            }
        }
        self.text(value).map(|scope| scope.to_lowercase())
    }
}

/// Compiles marked classes into root elements.
#[derive(Debug)]
pub struct DocumentCompiler<'m, 'a> {
    model: &'m SemanticModel<'a>,
    block: BlockCompiler,
}

impl<'m, 'a> DocumentCompiler<'m, 'a> {
    /// Creates a document compiler over a semantic model.
    #[must_use]
    pub fn new(model: &'m SemanticModel<'a>) -> Self {
        Self {
            model,
            block: BlockCompiler::new(),
        }
    }

    /// Compiles every part of the class named `class_name` into a root element.
    ///
    /// Problems are reported to `diagnostics`; the returned element holds
    /// whatever could be compiled.
    pub fn compile(
        &self,
        class_name: &str,
        marker: &DocumentMarker,
        diagnostics: &DiagnosticSink,
    ) -> Element {
        let variables = VariableBindings::new();
        let mut root = Element::new(marker.kind.root_element());
        let mut seen = BTreeSet::new();

        for part in self.model.class_parts(class_name) {
            for method in part.class.methods() {
                let Some(section) = Section::from_method_name(&method.name, marker.kind) else {
                    continue;
                };
                let receiver = method.parameters.first().map_or("", |p| p.name.as_str());
                let mut context = CompilationContext::new(
                    self.model,
                    part.tree,
                    part.class,
                    receiver,
                    diagnostics,
                    &variables,
                    Element::new(section.element_name()),
                );

                if !seen.insert(section) {
                    context.report(
                        DiagnosticCode::DuplicateSection,
                        method.name_span,
                        format!("Section '{section}' is already defined in document '{}'", marker.name),
                    );
                    continue;
                }
                let Some(MethodBody::Block(body)) = &method.body else {
                    context.report(
                        DiagnosticCode::EmptySection,
                        method.name_span,
                        format!("Section '{section}' cannot be empty or expression-bodied"),
                    );
                    continue;
                };

                self.block.compile(&mut context, body);
                debug!(document = %marker.name, section = %section, "Compiled section");

                let element = context.into_element();
                if section == Section::Fragment {
                    root = element;
                } else {
                    root.add_element(element);
                }
            }
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, SyntaxTree};
    use tollgate_core::{SourceFile, WriterOptions, XmlWriter};

    fn trees(sources: &[&str]) -> Vec<SyntaxTree> {
        sources
            .iter()
            .enumerate()
            .map(|(i, text)| parse(SourceFile::new(format!("File{i}.cs"), *text)).unwrap())
            .collect()
    }

    fn marker_of(source: &str) -> (Option<DocumentMarker>, Vec<Diagnostic>) {
        let trees = trees(&[source]);
        let model = SemanticModel::new(&trees);
        let sink = DiagnosticSink::new();
        let class = model.classes().next().unwrap();
        (read_marker(&model, class, &sink), sink.into_vec())
    }

    #[test]
    fn test_marker_forms() {
        let (marker, _) = marker_of("[Document] class Echo { }");
        assert_eq!(marker, Some(DocumentMarker::new("Echo", DocumentKind::Document)));

        let (marker, _) = marker_of(r#"[Document("echo-api")] class Echo { }"#);
        assert_eq!(marker.unwrap().name, "echo-api");

        let (marker, _) =
            marker_of(r#"[DocumentAttribute(Name = "echo", Scope = DocumentScope.Product)] class Echo { }"#);
        assert_eq!(
            marker,
            Some(DocumentMarker::new("echo", DocumentKind::Document).with_scope("product"))
        );

        let (marker, _) = marker_of(r#"[Fragment("cors")] class Cors { }"#);
        assert_eq!(marker, Some(DocumentMarker::new("cors", DocumentKind::Fragment)));

        let (marker, _) = marker_of("[Serializable] class Plain { }");
        assert_eq!(marker, None);
    }

    #[test]
    fn test_marker_name_from_constant() {
        let (marker, diagnostics) =
            marker_of(r#"[Document(Names.Echo)] class Echo { } static class Names { public const string Echo = "echo-v2"; }"#);
        assert!(diagnostics.is_empty());
        assert_eq!(marker.unwrap().name, "echo-v2");

        let (marker, diagnostics) = marker_of("[Document(Names.Missing)] class Echo { }");
        assert_eq!(marker.unwrap().name, "Echo");
        assert_eq!(diagnostics[0].code, DiagnosticCode::NotConstant);
    }

    #[test]
    fn test_marker_name_must_be_a_file_name() {
        for source in [
            r#"[Document("../escaped")] class Echo { }"#,
            r#"[Document("nested/echo")] class Echo { }"#,
            r#"[Document(Name = "..\\echo")] class Echo { }"#,
            r#"[Fragment("..")] class Echo { }"#,
        ] {
            let (marker, diagnostics) = marker_of(source);
            assert_eq!(marker.unwrap().name, "Echo", "{source}");
            assert_eq!(diagnostics.len(), 1, "{source}");
            assert_eq!(diagnostics[0].code, DiagnosticCode::ParameterNotSupported);
        }

        let (marker, diagnostics) = marker_of(r#"[Document("echo.v2")] class Echo { }"#);
        assert!(diagnostics.is_empty());
        assert_eq!(marker.unwrap().name, "echo.v2");
    }

    fn compile(sources: &[&str], class_name: &str) -> (String, Vec<Diagnostic>) {
        let trees = trees(sources);
        let model = SemanticModel::new(&trees);
        let sink = DiagnosticSink::new();
        let class = model.class_parts(class_name)[0];
        let marker = read_marker(&model, class, &sink).unwrap();
        let root = DocumentCompiler::new(&model).compile(class_name, &marker, &sink);
        (XmlWriter::new(WriterOptions::compact()).write(&root), sink.into_vec())
    }

    #[test]
    fn test_sections_in_source_order() {
        let (xml, diagnostics) = compile(
            &[r#"[Document] class P
            {
                public void Outbound(IOutboundContext context) { context.Base(); }
                string Helper() => "x";
                public void Inbound(IInboundContext context) { context.Base(); }
            }"#],
            "P",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            xml,
            "<policies><outbound><base /></outbound><inbound><base /></inbound></policies>"
        );
    }

    #[test]
    fn test_partial_class_parts_merge() {
        let (xml, diagnostics) = compile(
            &[
                "[Document] partial class P { public void Inbound(IInboundContext c) { c.Base(); } }",
                "partial class P { public void OnError(IOnErrorContext c) { c.Base(); } }",
            ],
            "P",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            xml,
            "<policies><inbound><base /></inbound><on-error><base /></on-error></policies>"
        );
    }

    #[test]
    fn test_duplicate_and_empty_sections() {
        let (xml, diagnostics) = compile(
            &[r"[Document] class P
            {
                public void Inbound(IInboundContext context) { context.Base(); }
                public void Inbound(IInboundContext context, int extra) { }
                public void Backend(IBackendContext context) => context.Base();
                public abstract void Outbound(IOutboundContext context);
            }"],
            "P",
        );
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [
                DiagnosticCode::DuplicateSection,
                DiagnosticCode::EmptySection,
                DiagnosticCode::EmptySection
            ]
        );
        assert_eq!(xml, "<policies><inbound><base /></inbound></policies>");
    }

    #[test]
    fn test_fragment_compiles_into_root() {
        let (xml, diagnostics) = compile(
            &[r#"[Fragment("cors")] class Cors
            {
                public void Fragment(IFragmentContext context) { context.SetHeader("Vary", "Origin"); }
                public void Inbound(IInboundContext context) { context.Base(); }
            }"#],
            "Cors",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            xml,
            r#"<fragment><set-header name="Vary" exists-action="override"><value>Origin</value></set-header></fragment>"#
        );
    }
}
