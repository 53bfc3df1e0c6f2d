//! Property-based tests for compilation.

use proptest::prelude::*;

use tollgate_core::expression::INLINE_EXPRESSION_MARKER;
use tollgate_core::{SourceFile, WriterOptions};

use crate::Compiler;

/// Strategy for configuration field names.
fn field_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}"
}

/// Strategy for string literal contents, including characters that need escaping.
fn literal_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 <>&'/=.-]{0,16}"
}

fn document(statements: &str) -> String {
    format!("[Document] class P {{ void Inbound(IInboundContext context) {{ {statements} }} }}")
}

fn compile(text: String) -> (String, Vec<tollgate_core::Diagnostic>) {
    let mut documents = Compiler::default()
        .compile_sources(vec![SourceFile::new("P.cs", text)])
        .expect("generated source parses");
    let document = documents.remove(0);
    (document.to_xml(WriterOptions::compact()), document.diagnostics)
}

proptest! {
    /// Nested entries are emitted in the order they were written in.
    #[test]
    fn nested_entries_keep_source_order(
        names in prop::collection::btree_set(field_strategy(), 1..6)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let apis = names
            .iter()
            .map(|n| format!("new ApiRateLimit {{ Name = \"{n}\", Calls = 1, RenewalPeriod = 60 }}"))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = format!(
            "context.RateLimit(new RateLimitConfig {{ Calls = 10, RenewalPeriod = 60, Apis = new[] {{ {apis} }} }});"
        );
        let (xml, diagnostics) = compile(document(&statement));
        prop_assert!(diagnostics.is_empty());

        let mut cursor = 0;
        for name in &names {
            let needle = format!("<api name=\"{name}\"");
            let found = xml[cursor..].find(&needle);
            prop_assert!(found.is_some(), "{} missing or out of order in {}", needle, xml);
            cursor += found.unwrap_or_default() + needle.len();
        }
    }

    /// Header values keep the order they were written in.
    #[test]
    fn values_keep_source_order(values in prop::collection::vec(literal_strategy(), 1..6)) {
        let arguments = values
            .iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let (xml, diagnostics) = compile(document(&format!("context.SetHeader(\"X\", {arguments});")));
        prop_assert!(diagnostics.is_empty());

        let mut cursor = 0;
        for value in &values {
            let escaped = value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
            let needle = format!("<value>{escaped}</value>");
            let found = xml[cursor..].find(&needle);
            prop_assert!(found.is_some(), "{} missing or out of order in {}", needle, xml);
            cursor += found.unwrap_or_default() + needle.len();
        }
    }

    /// Documents with only literal values never carry the inline marker or raw code.
    #[test]
    fn literal_documents_have_no_markers(
        name in literal_strategy(),
        value in literal_strategy(),
        calls in 0u32..1000
    ) {
        let statements = format!(
            "context.SetVariable(\"{name}\", \"{value}\"); \
             context.RateLimit(new RateLimitConfig {{ Calls = {calls}, RenewalPeriod = 60 }});"
        );
        let (xml, diagnostics) = compile(document(&statements));
        prop_assert!(diagnostics.is_empty());
        prop_assert!(!xml.contains(INLINE_EXPRESSION_MARKER), "inline marker leaked into {}", xml);
        prop_assert!(!xml.contains("@("));
    }

    /// Compiling the same source twice gives identical output and diagnostics.
    #[test]
    fn compilation_is_deterministic(
        values in prop::collection::vec(literal_strategy(), 0..5),
        unsupported in any::<bool>()
    ) {
        let mut statements = values
            .iter()
            .map(|v| format!("context.SetBody(\"{v}\");"))
            .collect::<Vec<_>>();
        if unsupported {
            statements.insert(statements.len() / 2, "while (true) { }".to_string());
        }
        let text = document(&statements.join(" "));
        prop_assert_eq!(compile(text.clone()), compile(text));
    }
}
