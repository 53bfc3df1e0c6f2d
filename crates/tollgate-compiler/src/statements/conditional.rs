//! `if` / `else if` / `else` chains.
//!
//! A chain compiles to one `choose` element with a `when` child per `if`
//! link and an `otherwise` child for a trailing `else`. A link whose body is
//! not a block or whose condition is not a call is reported and skipped; the
//! links after it are still compiled, and `choose` is emitted even when every
//! link was skipped.

use tollgate_core::{DiagnosticCode, Element};

use super::{report_expected_invocation, StatementCompiler};
use crate::block::BlockCompiler;
use crate::context::CompilationContext;
use crate::initializer::extract_value;
use crate::syntax::{Expr, IfStmt, StatementKind, Stmt};

/// Compiles conditional chains into `choose`.
#[derive(Debug)]
pub struct IfStatementCompiler;

impl IfStatementCompiler {
    fn compile_link(block: &BlockCompiler, choose: &mut CompilationContext<'_>, link: &IfStmt) {
        let Stmt::Block(body) = link.then_branch.as_ref() else {
            choose.report(
                DiagnosticCode::UnsupportedStatement,
                link.then_branch.span(),
                format!("{} is not supported as a branch body, expected Block", link.then_branch.kind()),
            );
            return;
        };
        if !matches!(link.condition, Expr::Invocation(_)) {
            report_expected_invocation(choose, &link.condition);
            return;
        }

        let condition = extract_value(choose, &link.condition);
        let condition = condition.as_str().unwrap_or_default();
        let mut when = choose.fork(Element::new("when").with_attribute("condition", condition));
        block.compile(&mut when, body);
        choose.add_element(when.into_element());
    }
}

impl StatementCompiler for IfStatementCompiler {
    fn kind(&self) -> StatementKind {
        StatementKind::If
    }

    fn compile(&self, block: &BlockCompiler, context: &mut CompilationContext<'_>, statement: &Stmt) {
        let Stmt::If(first) = statement else {
            return;
        };
        let mut choose = context.fork(Element::new("choose"));
        let mut link = first;
        loop {
            Self::compile_link(block, &mut choose, link);
            match link.else_branch.as_deref() {
                None => break,
                Some(Stmt::If(next)) => link = next,
                Some(Stmt::Block(body)) => {
                    let mut otherwise = choose.fork(Element::new("otherwise"));
                    block.compile(&mut otherwise, body);
                    choose.add_element(otherwise.into_element());
                    break;
                }
                Some(other) => {
                    choose.report(
                        DiagnosticCode::UnsupportedStatement,
                        other.span(),
                        format!("{} is not supported as a branch body, expected Block", other.kind()),
                    );
                    break;
                }
            }
        }
        context.add_element(choose.into_element());
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{compile_inbound, inbound_xml};
    use tollgate_core::{DiagnosticCode, WriterOptions, XmlWriter};

    const HELPERS: &str = r#"
        bool IsMobile(IExpressionContext c) => c.Request.Headers.ContainsKey("X-Mobile");
        bool IsTablet(IExpressionContext c) => c.Request.Headers.ContainsKey("X-Tablet");
    "#;

    fn xml(statements: &str) -> (String, Vec<tollgate_core::Diagnostic>) {
        let (inbound, diagnostics) = compile_inbound(statements, HELPERS);
        (XmlWriter::new(WriterOptions::compact()).write(&inbound), diagnostics)
    }

    #[test]
    fn test_if_else_chain() {
        let (xml, diagnostics) = xml(
            r#"if (IsMobile(context.ExpressionContext))
            {
                context.SetHeader("X-Device", "mobile");
            }
            else if (IsTablet(context.ExpressionContext))
            {
                context.SetHeader("X-Device", "tablet");
            }
            else
            {
                context.Base();
            }"#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(
            xml,
            concat!(
                "<inbound><choose>",
                r#"<when condition="@(c.Request.Headers.ContainsKey("X-Mobile"))">"#,
                r#"<set-header name="X-Device" exists-action="override"><value>mobile</value></set-header></when>"#,
                r#"<when condition="@(c.Request.Headers.ContainsKey("X-Tablet"))">"#,
                r#"<set-header name="X-Device" exists-action="override"><value>tablet</value></set-header></when>"#,
                "<otherwise><base /></otherwise>",
                "</choose></inbound>"
            )
        );
    }

    #[test]
    fn test_failed_link_does_not_stop_the_chain() {
        let (inbound, diagnostics) = compile_inbound(
            r#"if (true) { context.SetMethod("GET"); }
            else if (IsTablet(context.ExpressionContext)) { context.SetMethod("PUT"); }
            else context.SetMethod("POST");"#,
            HELPERS,
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnsupportedExpression);
        assert_eq!(diagnostics[1].code, DiagnosticCode::UnsupportedStatement);

        let choose = inbound.element("choose").unwrap();
        let branches: Vec<_> = choose.elements().collect();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "when");
        assert_eq!(branches[0].elements().next().unwrap().text(), "PUT");
    }

    #[test]
    fn test_non_block_body_is_skipped() {
        let (inbound, diagnostics) = compile_inbound(
            "if (IsMobile(context.ExpressionContext)) context.Base();",
            HELPERS,
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnsupportedStatement);
        assert!(inbound.element("choose").unwrap().is_empty());
    }

    #[test]
    fn test_nested_choose() {
        let xml = inbound_xml_with_helpers(
            "if (IsMobile(context.ExpressionContext)) { if (IsTablet(context.ExpressionContext)) { context.Base(); } }",
        );
        assert_eq!(
            xml,
            concat!(
                "<inbound><choose>",
                r#"<when condition="@(c.Request.Headers.ContainsKey("X-Mobile"))"><choose>"#,
                r#"<when condition="@(c.Request.Headers.ContainsKey("X-Tablet"))"><base /></when>"#,
                "</choose></when></choose></inbound>"
            )
        );
    }

    #[test]
    fn test_unresolved_condition_keeps_branch() {
        let (inbound, diagnostics) = compile_inbound("if (Missing()) { context.Base(); }", "");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::CannotResolveReferencedCode);
        let when = inbound.element("choose").unwrap().element("when").unwrap();
        assert_eq!(when.attribute("condition"), Some(""));
        assert!(when.element("base").is_some());
    }

    fn inbound_xml_with_helpers(statements: &str) -> String {
        let (xml, diagnostics) = xml(statements);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        xml
    }

    #[test]
    fn test_plain_block_is_flattened() {
        assert_eq!(
            inbound_xml("{ context.Base(); { context.SetMethod(\"GET\"); } }"),
            "<inbound><base /><set-method>GET</set-method></inbound>"
        );
    }
}
