//! `var name = context.Operation(args);`

use tollgate_core::DiagnosticCode;

use super::{operation_name, report_expected_invocation, report_method_not_supported, StatementCompiler};
use crate::block::BlockCompiler;
use crate::context::CompilationContext;
use crate::handlers::find_return_value_handler;
use crate::syntax::{Expr, StatementKind, Stmt};

/// Dispatches a bound call to its return value handler.
///
/// The handler stores the result in a gateway variable named after the
/// local, and later statements refer to the local by name.
#[derive(Debug)]
pub struct LocalDeclarationCompiler;

impl StatementCompiler for LocalDeclarationCompiler {
    fn kind(&self) -> StatementKind {
        StatementKind::LocalDeclaration
    }

    fn compile(&self, _block: &BlockCompiler, context: &mut CompilationContext<'_>, statement: &Stmt) {
        let Stmt::LocalDeclaration(declaration) = statement else {
            return;
        };
        let call = match &declaration.initializer {
            Some(Expr::Invocation(call)) => call,
            Some(other) => {
                report_expected_invocation(context, other);
                return;
            }
            None => {
                context.report(
                    DiagnosticCode::UnsupportedStatement,
                    declaration.span,
                    format!("Local '{}' must be initialized by a policy call", declaration.name),
                );
                return;
            }
        };
        match operation_name(context, call).and_then(find_return_value_handler) {
            Some(handler) => handler.handle(context, call, &declaration.name),
            None => report_method_not_supported(context, call),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::compile_inbound;
    use tollgate_core::DiagnosticCode;

    #[test]
    fn test_operation_without_return_value() {
        let (inbound, diagnostics) = compile_inbound("var x = context.Base();", "");
        assert!(inbound.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::MethodNotSupported);
    }

    #[test]
    fn test_initializer_must_be_a_call() {
        let (_, diagnostics) = compile_inbound(r#"var x = "literal";"#, "");
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnsupportedExpression);

        let (_, diagnostics) = compile_inbound("string x;", "");
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnsupportedStatement);
    }

    #[test]
    fn test_binding_is_visible_in_later_branches() {
        let (inbound, diagnostics) = compile_inbound(
            r#"var cached = context.CacheLookupValue(new CacheLookupValueConfig { Key = "k" });
               if (Missing()) { context.SetBody(cached); }"#,
            "bool Missing() => true;",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let when = inbound.element("choose").unwrap().element("when").unwrap();
        assert_eq!(
            when.element("set-body").unwrap().text(),
            "\u{1}@((string)context.Variables[\"cached\"])"
        );
    }
}
