//! Syntax tree of the authoring language.
//!
//! The tree keeps only what the compiler consumes: attributed class
//! declarations, their constant fields and methods, the restricted statement
//! grammar of method bodies, and expressions. Everything else is recorded by
//! span so that diagnostics can still point at it.

use std::fmt;

use tollgate_core::{SourceFile, Span};

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    /// The file the tree was parsed from.
    pub file: SourceFile,
    /// Namespace declared by the file, if any.
    pub namespace: Option<String>,
    /// Every class declared in the file, nested classes included.
    pub classes: Vec<ClassDecl>,
}

/// An attribute such as `[Document("echo", Scope = DocumentScope.Api)]`.
#[derive(Debug, Clone)]
pub struct AttributeSyntax {
    /// Attribute name as written (`Document`, `Policies.DocumentAttribute`).
    pub name: String,
    /// Arguments in source order.
    pub arguments: Vec<Argument>,
    /// Location of the attribute.
    pub span: Span,
}

impl AttributeSyntax {
    /// Returns the last segment of the name without an `Attribute` suffix.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let last = self.name.rsplit('.').next().unwrap_or(&self.name);
        last.strip_suffix("Attribute").unwrap_or(last)
    }
}

/// A class, struct or record declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    /// Class name.
    pub name: String,
    /// Attributes applied to the class.
    pub attributes: Vec<AttributeSyntax>,
    /// Modifiers such as `public` or `partial`.
    pub modifiers: Vec<String>,
    /// Base class and implemented interfaces.
    pub base_types: Vec<String>,
    /// Members in source order.
    pub members: Vec<Member>,
    /// Location of the name.
    pub name_span: Span,
    /// Location of the whole declaration.
    pub span: Span,
}

impl ClassDecl {
    /// Iterates over the methods of the class.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    /// Iterates over the fields of the class.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }
}

/// A member of a class.
#[derive(Debug, Clone)]
pub enum Member {
    /// Field declaration.
    Field(FieldDecl),
    /// Method declaration.
    Method(MethodDecl),
    /// Constructor, property, event or other member the compiler ignores.
    Other(Span),
}

/// A field declaration with a single declarator.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub ty: String,
    /// Whether the field is a `const`.
    pub is_const: bool,
    /// Initializer expression.
    pub initializer: Option<Expr>,
    /// Location of the declarator.
    pub span: Span,
}

/// A method declaration.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Method name.
    pub name: String,
    /// Return type as written.
    pub return_type: String,
    /// Parameters in order.
    pub parameters: Vec<Parameter>,
    /// Method body, `None` for abstract or interface-style declarations.
    pub body: Option<MethodBody>,
    /// Modifiers such as `public` or `static`.
    pub modifiers: Vec<String>,
    /// Location of the name.
    pub name_span: Span,
    /// Location of the whole declaration.
    pub span: Span,
}

/// A method parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter type.
    pub ty: String,
    /// Parameter name.
    pub name: String,
    /// Location of the parameter.
    pub span: Span,
}

/// Body of a method.
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// `{ ... }`
    Block(Block),
    /// `=> expr;`
    Expression(Expr),
}

impl MethodBody {
    /// Location of the body, excluding the `=>` of expression bodies.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Block(block) => block.span,
            Self::Expression(expr) => expr.span(),
        }
    }
}

/// A braced statement list.
#[derive(Debug, Clone)]
pub struct Block {
    /// Statements in source order.
    pub statements: Vec<Stmt>,
    /// Location including the braces.
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Nested block.
    Block(Block),
    /// Expression followed by `;`.
    Expression {
        /// The expression.
        expr: Expr,
        /// Location including the `;`.
        span: Span,
    },
    /// `if` statement with optional `else`.
    If(IfStmt),
    /// `var name = value;` or `Type name = value;`
    LocalDeclaration(LocalDeclaration),
    /// A statement the grammar recognises structurally but does not model.
    Other {
        /// What kind of statement it is.
        kind: StatementKind,
        /// Location of the statement.
        span: Span,
    },
    /// A statement that could not be parsed.
    Malformed {
        /// Parse error message.
        message: String,
        /// Location of the skipped tokens.
        span: Span,
    },
}

impl Stmt {
    /// Returns the kind used to dispatch the statement.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::Block(_) => StatementKind::Block,
            Self::Expression { .. } => StatementKind::Expression,
            Self::If(_) => StatementKind::If,
            Self::LocalDeclaration(_) => StatementKind::LocalDeclaration,
            Self::Other { kind, .. } => *kind,
            Self::Malformed { .. } => StatementKind::Malformed,
        }
    }

    /// Location of the statement.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Block(block) => block.span,
            Self::If(stmt) => stmt.span,
            Self::LocalDeclaration(decl) => decl.span,
            Self::Expression { span, .. } | Self::Other { span, .. } | Self::Malformed { span, .. } => *span,
        }
    }
}

/// `if (condition) then else otherwise`
#[derive(Debug, Clone)]
pub struct IfStmt {
    /// The condition.
    pub condition: Expr,
    /// Statement run when the condition holds.
    pub then_branch: Box<Stmt>,
    /// Statement after `else`, itself an `if` for `else if` chains.
    pub else_branch: Option<Box<Stmt>>,
    /// Location of the whole chain link.
    pub span: Span,
}

/// A local variable declaration with one declarator.
#[derive(Debug, Clone)]
pub struct LocalDeclaration {
    /// Declared type, `var` when inferred.
    pub ty: String,
    /// Variable name.
    pub name: String,
    /// Initializer.
    pub initializer: Option<Expr>,
    /// Location including the `;`.
    pub span: Span,
}

/// Statement kinds used for table-driven dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    /// `{ ... }`
    Block,
    /// `expr;`
    Expression,
    /// `if`
    If,
    /// `var x = ...;`
    LocalDeclaration,
    /// `;`
    Empty,
    /// `return`
    Return,
    /// `throw`
    Throw,
    /// `for`
    For,
    /// `foreach`
    ForEach,
    /// `while`
    While,
    /// `do ... while`
    Do,
    /// `switch`
    Switch,
    /// `try`
    Try,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `goto`
    Goto,
    /// `lock`
    Lock,
    /// `using`
    Using,
    /// `yield`
    Yield,
    /// Local function declaration.
    LocalFunction,
    /// Unparseable statement.
    Malformed,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Block => "Block",
            Self::Expression => "ExpressionStatement",
            Self::If => "IfStatement",
            Self::LocalDeclaration => "LocalDeclarationStatement",
            Self::Empty => "EmptyStatement",
            Self::Return => "ReturnStatement",
            Self::Throw => "ThrowStatement",
            Self::For => "ForStatement",
            Self::ForEach => "ForEachStatement",
            Self::While => "WhileStatement",
            Self::Do => "DoStatement",
            Self::Switch => "SwitchStatement",
            Self::Try => "TryStatement",
            Self::Break => "BreakStatement",
            Self::Continue => "ContinueStatement",
            Self::Goto => "GotoStatement",
            Self::Lock => "LockStatement",
            Self::Using => "UsingStatement",
            Self::Yield => "YieldStatement",
            Self::LocalFunction => "LocalFunctionStatement",
            Self::Malformed => "MalformedStatement",
        };
        f.write_str(name)
    }
}

/// A call or attribute argument.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Name for `name: value` or attribute `Name = value` arguments.
    pub name: Option<String>,
    /// Argument value.
    pub value: Expr,
    /// Location of the argument.
    pub span: Span,
}

/// Literal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// String or character literal; `value` holds the decoded text.
    String,
    /// Integer or real literal; `value` holds the digits without suffix.
    Number,
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// Interpolated string; `value` holds the source text.
    Interpolated,
}

/// A literal expression.
#[derive(Debug, Clone)]
pub struct Literal {
    /// Literal category.
    pub kind: LiteralKind,
    /// Decoded value.
    pub value: String,
    /// Location of the literal.
    pub span: Span,
}

/// A call `target<TypeArgs>(args)`.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Called expression, usually a name or member access.
    pub target: Box<Expr>,
    /// Generic type arguments.
    pub type_arguments: Vec<String>,
    /// Arguments in order.
    pub arguments: Vec<Argument>,
    /// Location of the call.
    pub span: Span,
}

impl Invocation {
    /// Name of the called method: the last segment of the target.
    #[must_use]
    pub fn method_name(&self) -> Option<&str> {
        match self.target.as_ref() {
            Expr::Name { name, .. } | Expr::MemberAccess { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Receiver of a member call, `None` for unqualified calls.
    #[must_use]
    pub fn receiver(&self) -> Option<&Expr> {
        match self.target.as_ref() {
            Expr::MemberAccess { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// `Name = value` inside an object initializer.
#[derive(Debug, Clone)]
pub struct FieldInitializer {
    /// Field name.
    pub name: String,
    /// Assigned value.
    pub value: Expr,
    /// Location of the assignment.
    pub span: Span,
}

/// Brace initializer following an object creation.
#[derive(Debug, Clone)]
pub enum Initializer {
    /// `{ A = 1, B = 2 }`
    Object(Vec<FieldInitializer>),
    /// `{ 1, 2 }`
    Collection(Vec<Expr>),
}

/// `new Type(args) { initializer }` and its target-typed or anonymous forms.
#[derive(Debug, Clone)]
pub struct ObjectCreation {
    /// Created type, `None` for `new()`, `new { }` and nested `{ }` initializers.
    pub ty: Option<String>,
    /// Constructor arguments when a parenthesised list was written.
    pub arguments: Option<Vec<Argument>>,
    /// Brace initializer.
    pub initializer: Option<Initializer>,
    /// Location of the expression.
    pub span: Span,
}

/// Body of a lambda expression.
#[derive(Debug, Clone)]
pub enum LambdaBody {
    /// Single expression.
    Expression(Box<Expr>),
    /// Statement block, kept by span only.
    Block(Span),
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value.
    Literal(Literal),
    /// Simple name, `this` or `base`.
    Name {
        /// Identifier text.
        name: String,
        /// Location.
        span: Span,
    },
    /// `target.name` or `target?.name`.
    MemberAccess {
        /// Accessed expression.
        target: Box<Expr>,
        /// Member name.
        name: String,
        /// Whether `?.` was used.
        conditional: bool,
        /// Location.
        span: Span,
    },
    /// Method call.
    Invocation(Invocation),
    /// `target[args]`.
    ElementAccess {
        /// Indexed expression.
        target: Box<Expr>,
        /// Index arguments.
        arguments: Vec<Argument>,
        /// Location.
        span: Span,
    },
    /// Object creation.
    ObjectCreation(ObjectCreation),
    /// `new[] { }`, `new T[] { }` or `[a, b]`.
    ArrayCreation {
        /// Element type when written.
        ty: Option<String>,
        /// Elements in order.
        elements: Vec<Expr>,
        /// Location.
        span: Span,
    },
    /// `x => body`.
    Lambda {
        /// Parameter names.
        parameters: Vec<String>,
        /// Lambda body.
        body: LambdaBody,
        /// Location.
        span: Span,
    },
    /// Prefix or postfix operator.
    Unary {
        /// Operator text.
        op: String,
        /// Operand.
        operand: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// Binary operator, including `is` and `as`.
    Binary {
        /// Operator text.
        op: String,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `a = b` and compound assignments.
    Assignment {
        /// Operator text.
        op: String,
        /// Assigned target.
        target: Box<Expr>,
        /// Assigned value.
        value: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `c ? a : b`.
    Conditional {
        /// Condition.
        condition: Box<Expr>,
        /// Value when true.
        when_true: Box<Expr>,
        /// Value when false.
        when_false: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `(Type)expr`.
    Cast {
        /// Target type.
        ty: String,
        /// Converted expression.
        expr: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `typeof(T)`, `default(T)`, `default` and `nameof(x)`-style keyword forms.
    TypeOperator {
        /// Keyword text.
        keyword: String,
        /// Location.
        span: Span,
    },
    /// `(expr)`.
    Parenthesized {
        /// Inner expression.
        inner: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// A type name used as an operand, e.g. the right side of `is`.
    Type {
        /// Type text.
        ty: String,
        /// Location.
        span: Span,
    },
    /// Code outside the modelled grammar, kept by span only.
    Opaque {
        /// Location.
        span: Span,
    },
}

impl Expr {
    /// Location of the expression.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(literal) => literal.span,
            Self::Invocation(invocation) => invocation.span,
            Self::ObjectCreation(creation) => creation.span,
            Self::Name { span, .. }
            | Self::MemberAccess { span, .. }
            | Self::ElementAccess { span, .. }
            | Self::ArrayCreation { span, .. }
            | Self::Lambda { span, .. }
            | Self::Unary { span, .. }
            | Self::Binary { span, .. }
            | Self::Assignment { span, .. }
            | Self::Conditional { span, .. }
            | Self::Cast { span, .. }
            | Self::TypeOperator { span, .. }
            | Self::Parenthesized { span, .. }
            | Self::Type { span, .. }
            | Self::Opaque { span } => *span,
        }
    }

    /// Short name of the expression shape, used in diagnostics.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Literal(_) => "LiteralExpression",
            Self::Name { .. } => "IdentifierName",
            Self::MemberAccess { .. } => "MemberAccessExpression",
            Self::Invocation(_) => "InvocationExpression",
            Self::ElementAccess { .. } => "ElementAccessExpression",
            Self::ObjectCreation(_) => "ObjectCreationExpression",
            Self::ArrayCreation { .. } => "ArrayCreationExpression",
            Self::Lambda { .. } => "LambdaExpression",
            Self::Unary { .. } => "UnaryExpression",
            Self::Binary { .. } => "BinaryExpression",
            Self::Assignment { .. } => "AssignmentExpression",
            Self::Conditional { .. } => "ConditionalExpression",
            Self::Cast { .. } => "CastExpression",
            Self::TypeOperator { .. } => "TypeOperatorExpression",
            Self::Parenthesized { .. } => "ParenthesizedExpression",
            Self::Type { .. } => "TypeSyntax",
            Self::Opaque { .. } => "OpaqueExpression",
        }
    }

    /// Dotted path of a name or member access chain, e.g. `Limits.Calls`.
    #[must_use]
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Self::Name { name, .. } => Some(name.clone()),
            Self::MemberAccess {
                target,
                name,
                conditional: false,
                ..
            } => target.dotted_path().map(|path| format!("{path}.{name}")),
            _ => None,
        }
    }
}
