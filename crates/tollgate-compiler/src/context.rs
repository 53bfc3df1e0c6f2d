//! Compilation context threaded through statement compilers and handlers.
//!
//! A [`CompilationContext`] owns the element currently being built and
//! borrows everything shared by one document: the semantic model, the
//! diagnostic sink and the variable bindings. Forking a context starts a new
//! child element while still reporting into the same sink.

use std::cell::RefCell;
use std::collections::BTreeMap;

use tollgate_core::{Diagnostic, DiagnosticCode, DiagnosticSink, Element, SourceFile, Span};

use crate::semantic::SemanticModel;
use crate::syntax::{ClassDecl, SyntaxTree};

/// Names bound by local declarations, shared across one document.
///
/// `var token = context.AuthenticationManagedIdentity(...)` binds `token` to
/// the gateway variable the policy writes, so later statements can refer to
/// it by name.
#[derive(Debug, Default)]
pub struct VariableBindings {
    names: RefCell<BTreeMap<String, String>>,
}

impl VariableBindings {
    /// Creates an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a local name to a gateway variable.
    pub fn bind(&self, local: impl Into<String>, variable: impl Into<String>) {
        self.names.borrow_mut().insert(local.into(), variable.into());
    }

    /// Gateway variable bound to a local name.
    #[must_use]
    pub fn lookup(&self, local: &str) -> Option<String> {
        self.names.borrow().get(local).cloned()
    }
}

/// State of the compiler at one point of a document.
#[derive(Debug)]
pub struct CompilationContext<'a> {
    model: &'a SemanticModel<'a>,
    tree: &'a SyntaxTree,
    class: &'a ClassDecl,
    receiver: &'a str,
    diagnostics: &'a DiagnosticSink,
    variables: &'a VariableBindings,
    element: Element,
}

impl<'a> CompilationContext<'a> {
    /// Creates a root context building `element`.
    ///
    /// `receiver` is the name of the lifecycle method's context parameter;
    /// only calls made on it are policy operations.
    #[must_use]
    pub const fn new(
        model: &'a SemanticModel<'a>,
        tree: &'a SyntaxTree,
        class: &'a ClassDecl,
        receiver: &'a str,
        diagnostics: &'a DiagnosticSink,
        variables: &'a VariableBindings,
        element: Element,
    ) -> Self {
        Self {
            model,
            tree,
            class,
            receiver,
            diagnostics,
            variables,
            element,
        }
    }

    /// Creates a child context building `element`, sharing everything else.
    #[must_use]
    pub const fn fork(&self, element: Element) -> Self {
        Self {
            model: self.model,
            tree: self.tree,
            class: self.class,
            receiver: self.receiver,
            diagnostics: self.diagnostics,
            variables: self.variables,
            element,
        }
    }

    /// Semantic model of the compilation.
    #[must_use]
    pub const fn model(&self) -> &'a SemanticModel<'a> {
        self.model
    }

    /// Source file being compiled.
    #[must_use]
    pub const fn file(&self) -> &'a SourceFile {
        &self.tree.file
    }

    /// Class declaring the code being compiled.
    #[must_use]
    pub const fn class(&self) -> &'a ClassDecl {
        self.class
    }

    /// Name of the context parameter policy operations are called on.
    #[must_use]
    pub const fn receiver(&self) -> &'a str {
        self.receiver
    }

    /// Variable bindings of the document.
    #[must_use]
    pub const fn variables(&self) -> &'a VariableBindings {
        self.variables
    }

    /// Element under construction.
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    /// Appends a child element to the element under construction.
    pub fn add_element(&mut self, element: Element) {
        self.element.add_element(element);
    }

    /// Appends raw markup to the element under construction.
    pub fn add_raw(&mut self, markup: impl Into<String>) {
        self.element.add_raw(markup);
    }

    /// Finishes the context, returning the element it built.
    #[must_use]
    pub fn into_element(self) -> Element {
        self.element
    }

    /// Reports a diagnostic located at `span` in the current file.
    pub fn report(&self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        let location = self.tree.file.location(span);
        self.diagnostics.report(Diagnostic::new(code, location, message));
    }

    /// Source text covered by `span`.
    #[must_use]
    pub fn source_text(&self, span: Span) -> &'a str {
        self.tree.file.slice(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn test_forked_contexts_share_diagnostics() {
        let trees = vec![parse(SourceFile::new("P.cs", "class P { }")).unwrap()];
        let model = SemanticModel::new(&trees);
        let sink = DiagnosticSink::new();
        let variables = VariableBindings::new();
        let tree = &trees[0];

        let mut root = CompilationContext::new(
            &model,
            tree,
            &tree.classes[0],
            "context",
            &sink,
            &variables,
            Element::new("inbound"),
        );
        let child = root.fork(Element::new("when"));
        child.report(DiagnosticCode::UnsupportedStatement, Span::new(0, 5, 1, 1), "nested");
        root.add_element(child.into_element());
        root.report(DiagnosticCode::EmptySection, Span::new(0, 5, 1, 1), "outer");

        let element = root.into_element();
        assert_eq!(element.elements().count(), 1);
        let diagnostics = sink.into_vec();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].message, "nested");
        assert_eq!(diagnostics[0].location.file, "P.cs");
    }

    #[test]
    fn test_variable_bindings() {
        let variables = VariableBindings::new();
        variables.bind("token", "token");
        assert_eq!(variables.lookup("token").as_deref(), Some("token"));
        assert!(variables.lookup("other").is_none());
    }
}
