//! Statement-list compilation.

use tollgate_core::DiagnosticCode;

use crate::context::CompilationContext;
use crate::statements::{StatementCompiler, STATEMENT_COMPILERS};
use crate::syntax::{Block, Stmt};

/// Compiles statements in source order by dispatching on their kind.
///
/// A statement without a registered compiler is reported and skipped; its
/// siblings still compile.
pub struct BlockCompiler {
    compilers: &'static [&'static dyn StatementCompiler],
}

impl BlockCompiler {
    /// Creates a block compiler over [`STATEMENT_COMPILERS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_compilers(STATEMENT_COMPILERS)
    }

    /// Creates a block compiler over a custom table.
    #[must_use]
    pub const fn with_compilers(compilers: &'static [&'static dyn StatementCompiler]) -> Self {
        Self { compilers }
    }

    /// Compiles every statement of `block` into the context's element.
    pub fn compile(&self, context: &mut CompilationContext<'_>, block: &Block) {
        for statement in &block.statements {
            self.compile_statement(context, statement);
        }
    }

    /// Compiles one statement into the context's element.
    pub fn compile_statement(&self, context: &mut CompilationContext<'_>, statement: &Stmt) {
        if let Stmt::Malformed { message, span } = statement {
            context.report(DiagnosticCode::InvalidSyntax, *span, message.clone());
            return;
        }
        let kind = statement.kind();
        match self.compilers.iter().find(|c| c.kind() == kind) {
            Some(compiler) => compiler.compile(self, context, statement),
            None => context.report(
                DiagnosticCode::UnsupportedStatement,
                statement.span(),
                format!("{kind} is not supported"),
            ),
        }
    }
}

impl Default for BlockCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCompiler")
            .field("compilers", &self.compilers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::ExpressionStatementCompiler;
    use crate::testing::compile_inbound;
    use tollgate_core::{WriterOptions, XmlWriter};

    #[test]
    fn test_unsupported_statement_keeps_siblings() {
        let (inbound, diagnostics) = compile_inbound(
            r#"context.SetMethod("GET");
            for (var i = 0; i < 3; i++) { context.Base(); }
            context.SetBody("done");"#,
            "",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnsupportedStatement);
        assert_eq!(diagnostics[0].message, "ForStatement is not supported");
        assert_eq!(
            XmlWriter::new(WriterOptions::compact()).write(&inbound),
            "<inbound><set-method>GET</set-method><set-body>done</set-body></inbound>"
        );
    }

    #[test]
    fn test_return_and_try_are_unsupported() {
        let (_, diagnostics) = compile_inbound("try { context.Base(); } catch { } return;", "");
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["TryStatement is not supported", "ReturnStatement is not supported"]);
    }

    #[test]
    fn test_custom_table() {
        static ONLY_CALLS: &[&dyn StatementCompiler] = &[&ExpressionStatementCompiler];
        let block = BlockCompiler::with_compilers(ONLY_CALLS);
        assert_eq!(format!("{block:?}"), "BlockCompiler { compilers: 1 }");
    }
}
