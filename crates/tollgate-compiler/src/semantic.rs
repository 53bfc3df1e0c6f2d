//! Symbol resolution over the parsed files of one compilation.
//!
//! The compiler only needs three questions answered about a referenced
//! symbol: which class declares it, whether it is a constant (and its value),
//! and which method body a call refers to. [`SemanticModel`] answers them by
//! indexing class declarations across every tree.
//!
//! # Example
//!
//! ```rust
//! use tollgate_compiler::semantic::SemanticModel;
//! use tollgate_compiler::syntax::{parse, Expr};
//! use tollgate_core::SourceFile;
//!
//! let tree = parse(SourceFile::new(
//!     "Limits.cs",
//!     "static class Limits { public const string Prefix = \"api-\"; public const string Key = Prefix + \"key\"; }",
//! ))?;
//! let trees = [tree];
//! let model = SemanticModel::new(&trees);
//!
//! let key = Expr::Name { name: "Key".into(), span: Default::default() };
//! assert_eq!(model.evaluate_constant("Limits", &key).as_deref(), Ok("api-key"));
//! # Ok::<(), tollgate_compiler::CompilerError>(())
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tollgate_core::expression::{inline_block, inline_expression};

use crate::syntax::{
    strip_trivia, ClassDecl, Expr, FieldDecl, Invocation, LiteralKind, MethodBody, MethodDecl,
    SyntaxTree,
};

/// A class declaration together with the tree that contains it.
#[derive(Debug, Clone, Copy)]
pub struct ClassRef<'a> {
    /// Tree containing the declaration.
    pub tree: &'a SyntaxTree,
    /// The declaration.
    pub class: &'a ClassDecl,
}

/// A method declaration together with the tree that contains it.
#[derive(Debug, Clone, Copy)]
pub struct MethodRef<'a> {
    /// Tree containing the declaration.
    pub tree: &'a SyntaxTree,
    /// Class declaring the method.
    pub class: &'a ClassDecl,
    /// The declaration.
    pub method: &'a MethodDecl,
}

impl MethodRef<'_> {
    /// Copies the method body as an inline expression.
    ///
    /// Expression bodies become `@(code)` and block bodies `@{code}`, with
    /// trivia collapsed. Returns `None` for methods without a body.
    #[must_use]
    pub fn inline_value(&self) -> Option<String> {
        let body = self.method.body.as_ref()?;
        let text = self.tree.file.slice(body.span());
        match body {
            MethodBody::Expression(_) => Some(inline_expression(&strip_trivia(text))),
            MethodBody::Block(_) => {
                let inner = text
                    .strip_prefix('{')
                    .and_then(|t| t.strip_suffix('}'))
                    .unwrap_or(text);
                Some(inline_block(&strip_trivia(inner)))
            }
        }
    }
}

/// Why a symbol did not resolve to a constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// No field with this name exists in the searched classes.
    Unresolved(String),
    /// The symbol exists but is not a `const` field.
    NotConstant(String),
    /// The constant's initializer refers back to itself.
    Cycle(String),
    /// The expression is not a compile-time constant.
    NotConstantExpression(&'static str),
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved(name) => write!(f, "'{name}' could not be resolved to a constant"),
            Self::NotConstant(name) => write!(f, "'{name}' is not a constant"),
            Self::Cycle(name) => write!(f, "Constant '{name}' depends on itself"),
            Self::NotConstantExpression(shape) => {
                write!(f, "{shape} is not a compile-time constant")
            }
        }
    }
}

/// Index of class declarations across every tree of a compilation.
#[derive(Debug)]
pub struct SemanticModel<'a> {
    trees: &'a [SyntaxTree],
    classes: BTreeMap<&'a str, Vec<ClassRef<'a>>>,
}

impl<'a> SemanticModel<'a> {
    /// Indexes the given trees.
    #[must_use]
    pub fn new(trees: &'a [SyntaxTree]) -> Self {
        let mut classes: BTreeMap<&'a str, Vec<ClassRef<'a>>> = BTreeMap::new();
        for tree in trees {
            for class in &tree.classes {
                classes
                    .entry(class.name.as_str())
                    .or_default()
                    .push(ClassRef { tree, class });
            }
        }
        Self { trees, classes }
    }

    /// The indexed trees.
    #[must_use]
    pub const fn trees(&self) -> &'a [SyntaxTree] {
        self.trees
    }

    /// Every class declaration in source order: file by file, then declaration order.
    pub fn classes(&self) -> impl Iterator<Item = ClassRef<'a>> + 'a {
        self.trees
            .iter()
            .flat_map(|tree| tree.classes.iter().map(move |class| ClassRef { tree, class }))
    }

    /// All declarations of a class, more than one for partial classes.
    #[must_use]
    pub fn class_parts(&self, name: &str) -> &[ClassRef<'a>] {
        self.classes.get(name).map_or(&[], Vec::as_slice)
    }

    fn find_field(&self, class_name: &str, field: &str) -> Option<(&'a str, &'a FieldDecl)> {
        self.class_parts(class_name).iter().find_map(|part| {
            part.class
                .fields()
                .find(|f| f.name == field)
                .map(|f| (part.class.name.as_str(), f))
        })
    }

    /// Evaluates a constant expression in the scope of `class_name`.
    ///
    /// Accepts literals, references to `const` fields (`Name` within the
    /// class, `Type.Name` elsewhere), parentheses and `+` concatenation.
    ///
    /// # Errors
    ///
    /// Returns a [`SymbolError`] when any part of the expression is not a
    /// resolvable constant.
    pub fn evaluate_constant(&self, class_name: &str, expr: &Expr) -> Result<String, SymbolError> {
        self.evaluate(class_name, expr, &mut HashSet::new())
    }

    fn evaluate(
        &self,
        class_name: &str,
        expr: &Expr,
        visiting: &mut HashSet<(String, String)>,
    ) -> Result<String, SymbolError> {
        match expr {
            Expr::Literal(literal) => match literal.kind {
                LiteralKind::String | LiteralKind::Number | LiteralKind::Boolean => {
                    Ok(literal.value.clone())
                }
                LiteralKind::Null => Ok(String::new()),
                LiteralKind::Interpolated => {
                    Err(SymbolError::NotConstantExpression("An interpolated string"))
                }
            },
            Expr::Parenthesized { inner, .. } | Expr::Cast { expr: inner, .. } => {
                self.evaluate(class_name, inner, visiting)
            }
            Expr::Unary { op, operand, .. } if op == "-" => {
                let value = self.evaluate(class_name, operand, visiting)?;
                Ok(format!("-{value}"))
            }
            Expr::Binary { op, left, right, .. } if op == "+" => {
                let mut value = self.evaluate(class_name, left, visiting)?;
                value.push_str(&self.evaluate(class_name, right, visiting)?);
                Ok(value)
            }
            Expr::Name { .. } | Expr::MemberAccess { .. } => {
                let path = expr
                    .dotted_path()
                    .ok_or(SymbolError::NotConstantExpression("A conditional member access"))?;
                self.evaluate_symbol(class_name, &path, visiting)
            }
            other => Err(SymbolError::NotConstantExpression(other.shape())),
        }
    }

    fn evaluate_symbol(
        &self,
        class_name: &str,
        path: &str,
        visiting: &mut HashSet<(String, String)>,
    ) -> Result<String, SymbolError> {
        let mut segments = path.rsplit('.');
        let field_name = segments.next().unwrap_or(path);
        let owner = segments.next().unwrap_or(class_name);

        let (owner, field) = self
            .find_field(owner, field_name)
            .ok_or_else(|| SymbolError::Unresolved(path.to_string()))?;
        if !field.is_const {
            return Err(SymbolError::NotConstant(path.to_string()));
        }
        let initializer = field
            .initializer
            .as_ref()
            .ok_or_else(|| SymbolError::NotConstant(path.to_string()))?;

        let key = (owner.to_string(), field.name.clone());
        if !visiting.insert(key.clone()) {
            return Err(SymbolError::Cycle(path.to_string()));
        }
        let value = self.evaluate(owner, initializer, visiting);
        visiting.remove(&key);
        value
    }

    /// Finds the method a call refers to.
    ///
    /// `Helper(...)` and `this.Helper(...)` look in `class_name`;
    /// `Type.Helper(...)` looks in `Type`. Overloads are told apart by
    /// parameter count only.
    #[must_use]
    pub fn resolve_method(&self, class_name: &str, call: &Invocation) -> Option<MethodRef<'a>> {
        let name = call.method_name()?;
        let owner = match call.receiver() {
            None => class_name.to_string(),
            Some(Expr::Name { name, .. }) if name == "this" => class_name.to_string(),
            Some(receiver) => {
                let path = receiver.dotted_path()?;
                path.rsplit('.').next().unwrap_or(&path).to_string()
            }
        };

        let candidates = self.class_parts(&owner).iter().flat_map(|part| {
            part.class.methods().filter(move |m| m.name == name).map(move |method| MethodRef {
                tree: part.tree,
                class: part.class,
                method,
            })
        });

        let mut fallback = None;
        for candidate in candidates {
            if candidate.method.parameters.len() == call.arguments.len() {
                return Some(candidate);
            }
            fallback.get_or_insert(candidate);
        }
        fallback
    }
}
