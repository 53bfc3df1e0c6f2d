//! Extraction of configuration values from expressions.
//!
//! Handlers never look at expression trees directly. They ask
//! [`extract_value`] for an [`InitializerValue`]: a single resolved string,
//! an ordered map of named fields, or an ordered list of elements. Anything
//! that cannot be turned into one of those is reported and replaced with an
//! empty string, so extraction always produces a value.

use tollgate_core::expression::inline_expression;
use tollgate_core::{DiagnosticCode, Span};

use crate::context::CompilationContext;
use crate::semantic::SymbolError;
use crate::syntax::{Expr, Initializer, Invocation, LiteralKind, ObjectCreation};

/// Shape of an extracted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// A resolved string, possibly carrying the inline expression marker.
    Single(String),
    /// Named fields in source order.
    Named(Vec<(String, InitializerValue)>),
    /// Elements in source order.
    Positional(Vec<InitializerValue>),
}

/// A configuration value extracted from an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerValue {
    /// Type named by the construction expression, if any.
    pub ty: Option<String>,
    /// The value itself.
    pub kind: ValueKind,
    /// Location of the originating expression.
    pub span: Span,
}

impl InitializerValue {
    /// Creates a single-string value.
    #[must_use]
    pub fn single(value: impl Into<String>, span: Span) -> Self {
        Self {
            ty: None,
            kind: ValueKind::Single(value.into()),
            span,
        }
    }

    /// Creates a named-field value.
    #[must_use]
    pub const fn named(ty: Option<String>, fields: Vec<(String, Self)>, span: Span) -> Self {
        Self {
            ty,
            kind: ValueKind::Named(fields),
            span,
        }
    }

    /// Creates a positional value.
    #[must_use]
    pub const fn positional(ty: Option<String>, elements: Vec<Self>, span: Span) -> Self {
        Self {
            ty,
            kind: ValueKind::Positional(elements),
            span,
        }
    }

    /// The resolved string of a single value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Named fields, empty for other shapes.
    #[must_use]
    pub fn fields(&self) -> &[(String, Self)] {
        match &self.kind {
            ValueKind::Named(fields) => fields,
            _ => &[],
        }
    }

    /// Looks up a named field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        self.fields().iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Positional elements, empty for other shapes.
    #[must_use]
    pub fn elements(&self) -> &[Self] {
        match &self.kind {
            ValueKind::Positional(elements) => elements,
            _ => &[],
        }
    }

    /// Type name without namespace qualification.
    #[must_use]
    pub fn simple_type_name(&self) -> Option<&str> {
        self.ty.as_deref().map(|ty| ty.rsplit('.').next().unwrap_or(ty))
    }
}

/// Extracts the configuration value of an expression.
///
/// Literals resolve to their text, object creations to named fields, array
/// and collection expressions to positional elements, constants to their
/// value and calls to helper methods to inline expressions. Everything else
/// is reported as unsupported and yields an empty string.
pub fn extract_value(context: &CompilationContext<'_>, expr: &Expr) -> InitializerValue {
    let span = expr.span();
    match expr {
        Expr::Literal(literal) => match literal.kind {
            LiteralKind::Null => InitializerValue::single("", span),
            LiteralKind::Interpolated => {
                InitializerValue::single(inline_expression(context.source_text(span)), span)
            }
            LiteralKind::String | LiteralKind::Number | LiteralKind::Boolean => {
                InitializerValue::single(literal.value.clone(), span)
            }
        },
        Expr::ObjectCreation(creation) => extract_object(context, creation),
        Expr::ArrayCreation { ty, elements, .. } => InitializerValue::positional(
            ty.clone(),
            elements.iter().map(|e| extract_value(context, e)).collect(),
            span,
        ),
        Expr::Invocation(call) => extract_referenced_code(context, call),
        Expr::Parenthesized { inner, .. } => extract_value(context, inner),
        Expr::Name { name, .. } => match context.variables().lookup(name) {
            Some(variable) => InitializerValue::single(
                inline_expression(&format!("(string)context.Variables[\"{variable}\"]")),
                span,
            ),
            None => extract_constant(context, expr),
        },
        Expr::MemberAccess { .. }
        | Expr::Binary { .. }
        | Expr::Unary { .. }
        | Expr::Cast { .. } => extract_constant(context, expr),
        other => {
            context.report(
                DiagnosticCode::ParameterNotSupported,
                span,
                format!("{} is not supported as a policy parameter", other.shape()),
            );
            InitializerValue::single("", span)
        }
    }
}

fn extract_object(context: &CompilationContext<'_>, creation: &ObjectCreation) -> InitializerValue {
    let span = creation.span;
    let ty = creation.ty.clone();
    match &creation.initializer {
        Some(Initializer::Object(fields)) => InitializerValue::named(
            ty,
            fields
                .iter()
                .map(|field| (field.name.clone(), extract_value(context, &field.value)))
                .collect(),
            span,
        ),
        Some(Initializer::Collection(elements)) => InitializerValue::positional(
            ty,
            elements.iter().map(|e| extract_value(context, e)).collect(),
            span,
        ),
        None => match creation.arguments.as_deref() {
            Some(arguments) if !arguments.is_empty() => InitializerValue::positional(
                ty,
                arguments
                    .iter()
                    .map(|argument| extract_value(context, &argument.value))
                    .collect(),
                span,
            ),
            _ => InitializerValue::named(ty, Vec::new(), span),
        },
    }
}

fn extract_referenced_code(context: &CompilationContext<'_>, call: &Invocation) -> InitializerValue {
    let span = call.span;
    let resolved = context
        .model()
        .resolve_method(&context.class().name, call)
        .and_then(|method| method.inline_value());

    if let Some(value) = resolved {
        return InitializerValue::single(value, span);
    }
    let name = call
        .target
        .dotted_path()
        .unwrap_or_else(|| context.source_text(call.target.span()).to_string());
    context.report(
        DiagnosticCode::CannotResolveReferencedCode,
        span,
        format!("Cannot find the code of '{name}'. Expression methods must be declared with a body in the compiled sources"),
    );
    InitializerValue::single("", span)
}

fn extract_constant(context: &CompilationContext<'_>, expr: &Expr) -> InitializerValue {
    let span = expr.span();
    match context.model().evaluate_constant(&context.class().name, expr) {
        Ok(value) => InitializerValue::single(value, span),
        Err(error) => {
            let is_reference = matches!(expr, Expr::Name { .. } | Expr::MemberAccess { .. });
            let code = match error {
                SymbolError::NotConstantExpression(_) if !is_reference => {
                    DiagnosticCode::ParameterNotSupported
                }
                _ => DiagnosticCode::NotConstant,
            };
            context.report(code, span, error.to_string());
            InitializerValue::single("", span)
        }
    }
}
