//! Statement compilers.
//!
//! One compiler is registered per statement kind in [`STATEMENT_COMPILERS`].
//! Compilers that contain nested blocks receive the [`BlockCompiler`] driving
//! them, so recursion goes back through the same dispatch table.

mod conditional;
mod declaration;
mod expression;

use tollgate_core::DiagnosticCode;

use crate::block::BlockCompiler;
use crate::context::CompilationContext;
use crate::syntax::{Expr, Invocation, StatementKind, Stmt};

pub use conditional::IfStatementCompiler;
pub use declaration::LocalDeclarationCompiler;
pub use expression::ExpressionStatementCompiler;

/// Compiles one kind of statement into the context's current element.
pub trait StatementCompiler: Sync {
    /// Statement kind handled by this compiler.
    fn kind(&self) -> StatementKind;

    /// Compiles `statement`, which is always of [`Self::kind`].
    fn compile(&self, block: &BlockCompiler, context: &mut CompilationContext<'_>, statement: &Stmt);
}

/// Compilers for every supported statement kind.
pub static STATEMENT_COMPILERS: &[&dyn StatementCompiler] = &[
    &NestedBlockCompiler,
    &ExpressionStatementCompiler,
    &IfStatementCompiler,
    &LocalDeclarationCompiler,
];

/// A nested `{ ... }` is flattened into the enclosing element.
#[derive(Debug)]
pub struct NestedBlockCompiler;

impl StatementCompiler for NestedBlockCompiler {
    fn kind(&self) -> StatementKind {
        StatementKind::Block
    }

    fn compile(&self, block: &BlockCompiler, context: &mut CompilationContext<'_>, statement: &Stmt) {
        if let Stmt::Block(nested) = statement {
            block.compile(context, nested);
        }
    }
}

/// Name of the policy operation a call invokes.
///
/// Only calls made directly on the lifecycle context parameter are policy
/// operations.
pub(crate) fn operation_name<'c>(context: &CompilationContext<'_>, call: &'c Invocation) -> Option<&'c str> {
    match call.receiver() {
        Some(Expr::Name { name, .. }) if name == context.receiver() => call.method_name(),
        _ => None,
    }
}

pub(crate) fn report_method_not_supported(context: &CompilationContext<'_>, call: &Invocation) {
    let target = context.source_text(call.target.span());
    context.report(
        DiagnosticCode::MethodNotSupported,
        call.span,
        format!("Method '{target}' is not supported"),
    );
}

pub(crate) fn report_expected_invocation(context: &CompilationContext<'_>, expr: &Expr) {
    context.report(
        DiagnosticCode::UnsupportedExpression,
        expr.span(),
        format!("{} is not supported, expected InvocationExpression", expr.shape()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_one_compiler_per_kind() {
        let mut kinds = HashSet::new();
        for compiler in STATEMENT_COMPILERS {
            assert!(kinds.insert(compiler.kind()));
        }
        assert!(!kinds.contains(&StatementKind::Malformed));
    }
}
