//! `context.Operation(args);`

use super::{operation_name, report_expected_invocation, report_method_not_supported, StatementCompiler};
use crate::block::BlockCompiler;
use crate::context::CompilationContext;
use crate::handlers::find_handler;
use crate::syntax::{Expr, StatementKind, Stmt};

/// Dispatches a call statement to its method policy handler.
#[derive(Debug)]
pub struct ExpressionStatementCompiler;

impl StatementCompiler for ExpressionStatementCompiler {
    fn kind(&self) -> StatementKind {
        StatementKind::Expression
    }

    fn compile(&self, _block: &BlockCompiler, context: &mut CompilationContext<'_>, statement: &Stmt) {
        let Stmt::Expression { expr, .. } = statement else {
            return;
        };
        let Expr::Invocation(call) = expr else {
            report_expected_invocation(context, expr);
            return;
        };
        match operation_name(context, call).and_then(find_handler) {
            Some(handler) => handler.handle(context, call),
            None => report_method_not_supported(context, call),
        }
    }
}
