//! Recursive-descent parser for the authoring language.
//!
//! The parser models class structure, the restricted statement grammar and a
//! practical expression grammar. Statements it cannot understand are kept as
//! [`Stmt::Malformed`] so one bad line never hides the rest of a file; only
//! structural damage (unbalanced braces, a missing class body) fails the
//! whole file with a [`CompilerError::ParseError`].

use tollgate_core::{SourceFile, Span};
use tracing::debug;

use super::ast::{
    Argument, AttributeSyntax, Block, ClassDecl, Expr, FieldDecl, FieldInitializer, IfStmt,
    Initializer, Invocation, LambdaBody, Literal, LiteralKind, LocalDeclaration, Member,
    MethodBody, MethodDecl, ObjectCreation, Parameter, StatementKind, Stmt, SyntaxTree,
};
use super::lexer::tokenize;
use super::token::{is_reserved, Token, TokenKind};
use crate::error::{CompilerError, Result};

/// Parses a source file into a syntax tree.
///
/// # Errors
///
/// Returns [`CompilerError::ParseError`] when the file cannot be tokenized or
/// its declarations are structurally broken.
///
/// # Examples
///
/// ```rust
/// use tollgate_compiler::syntax::parse;
/// use tollgate_core::SourceFile;
///
/// let tree = parse(SourceFile::new("Echo.cs", "class Echo { void Inbound(IInboundContext c) { c.Base(); } }"))?;
/// assert_eq!(tree.classes[0].name, "Echo");
/// # Ok::<(), tollgate_compiler::CompilerError>(())
/// ```
pub fn parse(file: SourceFile) -> Result<SyntaxTree> {
    debug!(file = %file.name(), "Parsing source file");

    let (namespace, classes) = {
        let tokens = tokenize(file.text()).map_err(|e| CompilerError::ParseError {
            file: file.name().to_string(),
            line: e.span.line,
            column: e.span.column,
            message: e.message,
        })?;
        let mut parser = Parser::new(&tokens);
        parser
            .parse_compilation_unit()
            .and_then(|unit| match parser.too_deep {
                Some(span) => Err(SyntaxError::too_deep(span)),
                None => Ok(unit),
            })
            .map_err(|e| CompilerError::ParseError {
                file: file.name().to_string(),
                line: e.span.line,
                column: e.span.column,
                message: e.message,
            })?
    };

    Ok(SyntaxTree {
        file,
        namespace,
        classes,
    })
}

#[derive(Debug)]
struct SyntaxError {
    message: String,
    span: Span,
}

impl SyntaxError {
    fn too_deep(span: Span) -> Self {
        Self {
            message: format!("Expression nested too deeply (more than {MAX_NESTING_DEPTH} levels)"),
            span,
        }
    }
}

type PResult<T> = std::result::Result<T, SyntaxError>;

/// Deepest expression or statement nesting the parser descends into.
const MAX_NESTING_DEPTH: usize = 128;

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "sealed", "abstract", "partial",
    "readonly", "unsafe", "new", "file", "virtual", "override", "extern", "async", "const",
    "volatile", "required",
];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", "??=",
];

const PREFIX_OPERATORS: &[&str] = &["!", "-", "+", "~", "++", "--"];

/// Reserved words that still name types.
const TYPE_KEYWORDS: &[&str] = &["bool", "void"];

struct Parser<'t, 'src> {
    tokens: &'t [Token<'src>],
    pos: usize,
    depth: usize,
    /// Where nesting first exceeded [`MAX_NESTING_DEPTH`]; fails the whole file.
    too_deep: Option<Span>,
}

impl<'t, 'src> Parser<'t, 'src> {
    const fn new(tokens: &'t [Token<'src>]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            too_deep: None,
        }
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            let here = self.peek().span;
            let span = *self.too_deep.get_or_insert(here);
            return Err(SyntaxError::too_deep(span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // =========================================
    // Token cursor
    // =========================================

    fn peek(&self) -> Token<'src> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token<'src> {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[(self.pos + n).min(last)]
    }

    fn advance(&mut self) -> Token<'src> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn at_punct(&self, p: &str) -> bool {
        self.peek().is_punct(p)
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek().is_word(word)
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            span: self.peek().span,
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            self.error_here(format!("Expected {expected} but reached end of file"))
        } else {
            self.error_here(format!("Expected {expected} but found '{}'", token.text))
        }
    }

    fn expect_punct(&mut self, p: &str) -> PResult<Token<'src>> {
        if self.at_punct(p) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{p}'")))
        }
    }

    fn expect_word(&mut self, word: &str) -> PResult<Token<'src>> {
        if self.at_word(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{word}'")))
        }
    }

    fn expect_ident(&mut self) -> PResult<Token<'src>> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier && !is_reserved(token.text) {
            Ok(self.advance())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// Runs `f`, rewinding to the starting token if it fails.
    fn try_parse<T>(&mut self, f: fn(&mut Self) -> PResult<T>) -> Option<T> {
        let start = self.pos;
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    // =========================================
    // Skipping
    // =========================================

    /// Skips a bracketed group starting at the current `(`, `[` or `{`.
    fn skip_balanced(&mut self) -> PResult<Span> {
        let open = self.advance();
        let mut stack = match open.text {
            "(" => vec![")"],
            "[" => vec!["]"],
            "{" => vec!["}"],
            _ => {
                return Err(SyntaxError {
                    message: format!("Expected an opening bracket but found '{}'", open.text),
                    span: open.span,
                })
            }
        };

        while let Some(&expected) = stack.last() {
            let token = self.advance();
            if token.kind == TokenKind::Eof {
                return Err(SyntaxError {
                    message: format!("Unbalanced '{}': expected '{expected}'", open.text),
                    span: open.span,
                });
            }
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.text {
                "(" => stack.push(")"),
                "[" => stack.push("]"),
                "{" => stack.push("}"),
                ")" | "]" | "}" if token.text == expected => {
                    stack.pop();
                }
                ")" | "]" | "}" => {
                    return Err(SyntaxError {
                        message: format!("Mismatched '{}': expected '{expected}'", token.text),
                        span: token.span,
                    });
                }
                _ => {}
            }
        }

        Ok(open.span.to(self.prev_span()))
    }

    fn at_open_bracket(&self) -> bool {
        self.at_punct("(") || self.at_punct("[") || self.at_punct("{")
    }

    /// Skips up to, but not including, the next `;` outside brackets.
    fn skip_until_semicolon(&mut self) -> PResult<()> {
        loop {
            if self.at_eof() {
                return Err(self.unexpected("';'"));
            }
            if self.at_punct(";") {
                return Ok(());
            }
            if self.at_punct("}") || self.at_punct(")") || self.at_punct("]") {
                return Err(self.unexpected("';'"));
            }
            if self.at_open_bracket() {
                self.skip_balanced()?;
            } else {
                self.advance();
            }
        }
    }

    fn skip_past_semicolon(&mut self) -> PResult<()> {
        self.skip_until_semicolon()?;
        self.advance();
        Ok(())
    }

    /// Skips a statement the parser could not understand.
    ///
    /// Stops after a `;` or a braced group, or before a `}` that closes the
    /// enclosing block.
    fn skip_statement(&mut self) -> PResult<()> {
        loop {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            if self.at_punct("}") {
                return Ok(());
            }
            if self.at_punct("{") {
                self.skip_balanced()?;
                return Ok(());
            }
            if self.at_punct("(") || self.at_punct("[") {
                self.skip_balanced()?;
                continue;
            }
            if self.advance().is_punct(";") {
                return Ok(());
            }
        }
    }

    /// Skips the remainder of a member the compiler does not model.
    fn skip_member_rest(&mut self) -> PResult<()> {
        loop {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            if self.at_punct(";") {
                self.advance();
                return Ok(());
            }
            if self.at_punct("=>") {
                return self.skip_past_semicolon();
            }
            if self.at_punct("{") {
                self.skip_balanced()?;
                if self.eat_punct("=") {
                    self.skip_past_semicolon()?;
                }
                return Ok(());
            }
            if self.at_punct("(") || self.at_punct("[") {
                self.skip_balanced()?;
            } else if self.at_punct("}") {
                return Err(self.unexpected("';'"));
            } else {
                self.advance();
            }
        }
    }

    fn skip_constraints(&mut self) -> PResult<()> {
        while self.at_word("where") {
            while !(self.at_punct("{") || self.at_punct(";") || self.at_punct("=>") || self.at_eof()) {
                if self.at_punct("(") {
                    self.skip_balanced()?;
                } else {
                    self.advance();
                }
                if self.at_word("where") {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Skips `<...>` type parameters.
    fn skip_angle_brackets(&mut self) -> PResult<()> {
        let open = self.expect_punct("<")?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.advance();
            if token.kind == TokenKind::Eof {
                return Err(SyntaxError {
                    message: "Unbalanced '<'".to_string(),
                    span: open.span,
                });
            }
            if token.is_punct("<") {
                depth += 1;
            } else if token.is_punct(">") {
                depth -= 1;
            }
        }
        Ok(())
    }

    // =========================================
    // Declarations
    // =========================================

    fn parse_compilation_unit(&mut self) -> PResult<(Option<String>, Vec<ClassDecl>)> {
        let mut namespace = None;
        let mut classes = Vec::new();
        self.parse_namespace_members(&mut namespace, &mut classes, false)?;
        Ok((namespace, classes))
    }

    fn parse_namespace_members(
        &mut self,
        namespace: &mut Option<String>,
        classes: &mut Vec<ClassDecl>,
        braced: bool,
    ) -> PResult<()> {
        loop {
            if self.at_eof() {
                if braced {
                    return Err(self.unexpected("'}'"));
                }
                return Ok(());
            }
            if braced && self.eat_punct("}") {
                return Ok(());
            }
            if self.at_word("using")
                || self.at_word("extern")
                || (self.at_word("global") && self.peek_nth(1).is_word("using"))
            {
                self.skip_past_semicolon()?;
                continue;
            }
            if self.eat_word("namespace") {
                let name = self.parse_qualified_name()?;
                namespace.get_or_insert(name);
                if self.eat_punct(";") {
                    continue;
                }
                self.expect_punct("{")?;
                self.parse_namespace_members(namespace, classes, true)?;
                continue;
            }
            self.parse_type_declaration(classes)?;
        }
    }

    fn parse_qualified_name(&mut self) -> PResult<String> {
        let mut name = self.expect_ident()?.text.to_string();
        while self.at_punct(".") || self.at_punct("::") {
            let separator = self.advance().text;
            name.push_str(separator);
            name.push_str(self.expect_ident()?.text);
        }
        Ok(name)
    }

    fn parse_modifiers(&mut self) -> Vec<String> {
        let mut modifiers = Vec::new();
        while self.peek().kind == TokenKind::Identifier && MODIFIERS.contains(&self.peek().text) {
            // `new()` in expressions never reaches here; `new` as a member modifier does
            modifiers.push(self.advance().text.to_string());
        }
        modifiers
    }

    fn parse_attribute_lists(&mut self) -> PResult<Vec<AttributeSyntax>> {
        let mut attributes = Vec::new();
        while self.eat_punct("[") {
            if self.peek().kind == TokenKind::Identifier && self.peek_nth(1).is_punct(":") {
                self.advance();
                self.advance();
            }
            loop {
                let start = self.peek().span;
                let name = self.parse_qualified_name()?;
                let mut arguments = Vec::new();
                if self.eat_punct("(") {
                    if !self.at_punct(")") {
                        loop {
                            arguments.push(self.parse_argument(true)?);
                            if !self.eat_punct(",") {
                                break;
                            }
                        }
                    }
                    self.expect_punct(")")?;
                }
                attributes.push(AttributeSyntax {
                    name,
                    arguments,
                    span: start.to(self.prev_span()),
                });
                if !self.eat_punct(",") || self.at_punct("]") {
                    break;
                }
            }
            self.expect_punct("]")?;
        }
        Ok(attributes)
    }

    fn parse_type_declaration(&mut self, classes: &mut Vec<ClassDecl>) -> PResult<()> {
        let start = self.peek().span;
        let attributes = self.parse_attribute_lists()?;
        let modifiers = self.parse_modifiers();

        if self.at_word("class") || self.at_word("struct") || self.at_word("record") {
            return self.parse_class(start, attributes, modifiers, classes);
        }
        if self.at_word("interface") || self.at_word("enum") {
            self.skip_type_body()?;
            return Ok(());
        }
        if self.at_word("delegate") {
            return self.skip_past_semicolon();
        }
        Err(self.unexpected("type declaration"))
    }

    fn skip_type_body(&mut self) -> PResult<()> {
        while !self.at_punct("{") {
            if self.at_eof() || self.at_punct("}") {
                return Err(self.unexpected("'{'"));
            }
            self.advance();
        }
        self.skip_balanced()?;
        self.eat_punct(";");
        Ok(())
    }

    fn parse_class(
        &mut self,
        start: Span,
        attributes: Vec<AttributeSyntax>,
        modifiers: Vec<String>,
        classes: &mut Vec<ClassDecl>,
    ) -> PResult<()> {
        let is_record = self.advance().is_word("record");
        if is_record && !self.eat_word("class") {
            self.eat_word("struct");
        }
        let name = self.expect_ident()?;
        if self.at_punct("<") {
            self.skip_angle_brackets()?;
        }
        if self.at_punct("(") {
            self.skip_balanced()?;
        }

        let mut base_types = Vec::new();
        if self.eat_punct(":") {
            loop {
                let (ty, _) = self.parse_type()?;
                base_types.push(ty);
                if self.at_punct("(") {
                    self.skip_balanced()?;
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.skip_constraints()?;

        let mut members = Vec::new();
        let mut nested = Vec::new();
        if !self.eat_punct(";") {
            self.expect_punct("{")?;
            while !self.eat_punct("}") {
                if self.at_eof() {
                    return Err(self.unexpected("'}'"));
                }
                self.parse_member(name.text, &mut members, &mut nested)?;
            }
            self.eat_punct(";");
        }

        classes.push(ClassDecl {
            name: name.text.to_string(),
            attributes,
            modifiers,
            base_types,
            members,
            name_span: name.span,
            span: start.to(self.prev_span()),
        });
        classes.extend(nested);
        Ok(())
    }

    fn parse_member(
        &mut self,
        class_name: &str,
        members: &mut Vec<Member>,
        nested: &mut Vec<ClassDecl>,
    ) -> PResult<()> {
        let start = self.peek().span;
        let attributes = self.parse_attribute_lists()?;
        let modifiers = self.parse_modifiers();

        if self.at_word("class")
            || self.at_word("struct")
            || (self.at_word("record") && self.peek_nth(1).kind == TokenKind::Identifier)
        {
            return self.parse_class(start, attributes, modifiers, nested);
        }
        if self.at_word("interface") || self.at_word("enum") {
            self.skip_type_body()?;
            members.push(Member::Other(start.to(self.prev_span())));
            return Ok(());
        }
        if self.at_word("delegate") || self.at_word("event") || self.at_punct("~") {
            self.skip_member_rest()?;
            members.push(Member::Other(start.to(self.prev_span())));
            return Ok(());
        }
        if self.at_word(class_name) && self.peek_nth(1).is_punct("(") {
            self.advance();
            self.skip_member_rest()?;
            members.push(Member::Other(start.to(self.prev_span())));
            return Ok(());
        }

        let (ty, _) = self.parse_type()?;
        if self.at_word("operator") || self.at_word("this") || ty == "implicit" || ty == "explicit" {
            self.skip_member_rest()?;
            members.push(Member::Other(start.to(self.prev_span())));
            return Ok(());
        }

        let mut name = self.expect_ident()?;
        while self.at_punct(".") {
            // Explicit interface implementation: `IFoo.Bar`
            self.advance();
            name = self.expect_ident()?;
        }
        if self.at_punct("<") {
            self.skip_angle_brackets()?;
        }

        if self.at_punct("(") {
            let method = self.parse_method(start, ty, name, modifiers)?;
            members.push(Member::Method(method));
        } else if self.at_punct("{") || self.at_punct("=>") {
            self.skip_member_rest()?;
            members.push(Member::Other(start.to(self.prev_span())));
        } else {
            self.parse_field_declarators(ty, name, &modifiers, members)?;
        }
        Ok(())
    }

    fn parse_method(
        &mut self,
        start: Span,
        return_type: String,
        name: Token<'src>,
        modifiers: Vec<String>,
    ) -> PResult<MethodDecl> {
        let parameters = self.parse_parameters()?;
        self.skip_constraints()?;

        let body = if self.at_punct("{") {
            Some(MethodBody::Block(self.parse_block()?))
        } else if self.eat_punct("=>") {
            let expr = self.parse_expression_body()?;
            self.expect_punct(";")?;
            Some(MethodBody::Expression(expr))
        } else {
            self.expect_punct(";")?;
            None
        };

        Ok(MethodDecl {
            name: name.text.to_string(),
            return_type,
            parameters,
            body,
            modifiers,
            name_span: name.span,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_parameters(&mut self) -> PResult<Vec<Parameter>> {
        self.expect_punct("(")?;
        let mut parameters = Vec::new();
        if self.eat_punct(")") {
            return Ok(parameters);
        }
        loop {
            let start = self.peek().span;
            self.parse_attribute_lists()?;
            while ["this", "ref", "out", "in", "params", "scoped"].iter().any(|m| self.at_word(m)) {
                self.advance();
            }
            let (ty, _) = self.parse_type()?;
            let name = self.expect_ident()?;
            if self.eat_punct("=") {
                while !(self.at_punct(",") || self.at_punct(")") || self.at_eof()) {
                    if self.at_open_bracket() {
                        self.skip_balanced()?;
                    } else {
                        self.advance();
                    }
                }
            }
            parameters.push(Parameter {
                ty,
                name: name.text.to_string(),
                span: start.to(self.prev_span()),
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(parameters)
    }

    fn parse_field_declarators(
        &mut self,
        ty: String,
        first: Token<'src>,
        modifiers: &[String],
        members: &mut Vec<Member>,
    ) -> PResult<()> {
        let is_const = modifiers.iter().any(|m| m == "const");
        let mut name = first;
        loop {
            let initializer = if self.eat_punct("=") {
                let start = self.pos;
                match self.parse_expression() {
                    Ok(expr) if self.at_punct(",") || self.at_punct(";") => Some(expr),
                    _ => {
                        self.pos = start;
                        while !(self.at_punct(",") || self.at_punct(";")) {
                            if self.at_eof() || self.at_punct("}") {
                                return Err(self.unexpected("';'"));
                            }
                            if self.at_open_bracket() {
                                self.skip_balanced()?;
                            } else {
                                self.advance();
                            }
                        }
                        None
                    }
                }
            } else {
                None
            };
            members.push(Member::Field(FieldDecl {
                name: name.text.to_string(),
                ty: ty.clone(),
                is_const,
                initializer,
                span: name.span.to(self.prev_span()),
            }));
            if !self.eat_punct(",") {
                break;
            }
            name = self.expect_ident()?;
        }
        self.expect_punct(";")?;
        Ok(())
    }

    // =========================================
    // Types
    // =========================================

    fn parse_type(&mut self) -> PResult<(String, Span)> {
        let start_pos = self.pos;
        let start = self.peek().span;

        if self.at_punct("(") {
            self.skip_balanced()?;
        } else {
            let token = self.peek();
            let usable = token.kind == TokenKind::Identifier
                && (!is_reserved(token.text) || TYPE_KEYWORDS.contains(&token.text));
            if !usable {
                return Err(self.unexpected("type"));
            }
            self.advance();
            loop {
                if self.at_punct("<") {
                    self.parse_type_arguments()?;
                }
                if (self.at_punct(".") || self.at_punct("::"))
                    && self.peek_nth(1).kind == TokenKind::Identifier
                {
                    self.advance();
                    self.advance();
                    continue;
                }
                break;
            }
        }

        loop {
            let next = self.peek_nth(1);
            if self.at_punct("?")
                && (next.kind == TokenKind::Identifier
                    || [">", ",", ")", "[", "]"].iter().any(|p| next.is_punct(p)))
            {
                self.advance();
            } else if self.at_punct("[") && (next.is_punct("]") || next.is_punct(",")) {
                self.skip_balanced()?;
            } else {
                break;
            }
        }

        let text = self.tokens[start_pos..self.pos]
            .iter()
            .map(|t| if t.is_punct(",") { ", " } else { t.text })
            .collect::<String>();
        Ok((text, start.to(self.prev_span())))
    }

    fn parse_type_arguments(&mut self) -> PResult<Vec<String>> {
        self.expect_punct("<")?;
        let mut arguments = Vec::new();
        if !self.at_punct(">") {
            loop {
                arguments.push(self.parse_type()?.0);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(">")?;
        Ok(arguments)
    }

    /// Parses `<T, U>` only when a call's `(` follows it.
    fn parse_call_type_arguments(&mut self) -> PResult<Vec<String>> {
        let arguments = self.parse_type_arguments()?;
        if self.at_punct("(") {
            Ok(arguments)
        } else {
            Err(self.unexpected("'('"))
        }
    }

    // =========================================
    // Statements
    // =========================================

    fn parse_block(&mut self) -> PResult<Block> {
        let open = self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.at_punct("}") {
            if self.at_eof() {
                return Err(SyntaxError {
                    message: "Unbalanced '{': expected '}'".to_string(),
                    span: open.span,
                });
            }
            statements.push(self.parse_statement_recovering()?);
        }
        let close = self.advance();
        Ok(Block {
            statements,
            span: open.span.to(close.span),
        })
    }

    fn parse_statement_recovering(&mut self) -> PResult<Stmt> {
        let start_pos = self.pos;
        match self.parse_statement() {
            Ok(stmt) => Ok(stmt),
            Err(error) if self.too_deep.is_some() => Err(error),
            Err(error) => {
                self.pos = start_pos;
                let start = self.peek().span;
                self.skip_statement()?;
                let span = if self.pos == start_pos {
                    start
                } else {
                    start.to(self.prev_span())
                };
                Ok(Stmt::Malformed {
                    message: error.message,
                    span,
                })
            }
        }
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> PResult<Stmt> {
        let token = self.peek();
        let start = token.span;

        if token.is_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if token.is_punct(";") {
            self.advance();
            return Ok(self.other(StatementKind::Empty, start));
        }

        if token.kind == TokenKind::Identifier {
            match token.text {
                "if" => return self.parse_if(),
                "return" => return self.parse_jump(StatementKind::Return),
                "throw" => return self.parse_jump(StatementKind::Throw),
                "break" => return self.parse_jump(StatementKind::Break),
                "continue" => return self.parse_jump(StatementKind::Continue),
                "goto" => return self.parse_jump(StatementKind::Goto),
                "yield" if self.peek_nth(1).is_word("return") || self.peek_nth(1).is_word("break") => {
                    return self.parse_jump(StatementKind::Yield);
                }
                "for" | "foreach" | "while" | "lock" => {
                    let kind = match token.text {
                        "for" => StatementKind::For,
                        "foreach" => StatementKind::ForEach,
                        "while" => StatementKind::While,
                        _ => StatementKind::Lock,
                    };
                    self.advance();
                    if !self.at_punct("(") {
                        return Err(self.unexpected("'('"));
                    }
                    self.skip_balanced()?;
                    self.parse_statement_recovering()?;
                    return Ok(self.other(kind, start));
                }
                "using" => {
                    self.advance();
                    if self.at_punct("(") {
                        self.skip_balanced()?;
                        self.parse_statement_recovering()?;
                    } else {
                        self.skip_past_semicolon()?;
                    }
                    return Ok(self.other(StatementKind::Using, start));
                }
                "do" => {
                    self.advance();
                    self.parse_statement_recovering()?;
                    self.expect_word("while")?;
                    if !self.at_punct("(") {
                        return Err(self.unexpected("'('"));
                    }
                    self.skip_balanced()?;
                    self.expect_punct(";")?;
                    return Ok(self.other(StatementKind::Do, start));
                }
                "switch" => {
                    self.advance();
                    if !self.at_punct("(") {
                        return Err(self.unexpected("'('"));
                    }
                    self.skip_balanced()?;
                    if !self.at_punct("{") {
                        return Err(self.unexpected("'{'"));
                    }
                    self.skip_balanced()?;
                    return Ok(self.other(StatementKind::Switch, start));
                }
                "try" => {
                    self.advance();
                    self.parse_block()?;
                    while self.eat_word("catch") {
                        if self.at_punct("(") {
                            self.skip_balanced()?;
                        }
                        if self.eat_word("when") {
                            self.skip_balanced()?;
                        }
                        self.parse_block()?;
                    }
                    if self.eat_word("finally") {
                        self.parse_block()?;
                    }
                    return Ok(self.other(StatementKind::Try, start));
                }
                _ => {}
            }
        }

        if let Some(stmt) = self.try_parse(Self::parse_local_declaration) {
            return Ok(stmt);
        }

        let expr = self.parse_expression()?;
        let end = self.expect_punct(";")?;
        Ok(Stmt::Expression {
            expr,
            span: start.to(end.span),
        })
    }

    fn other(&self, kind: StatementKind, start: Span) -> Stmt {
        Stmt::Other {
            kind,
            span: start.to(self.prev_span()),
        }
    }

    fn parse_jump(&mut self, kind: StatementKind) -> PResult<Stmt> {
        let start = self.advance().span;
        self.skip_past_semicolon()?;
        Ok(self.other(kind, start))
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let start = self.expect_word("if")?.span;
        self.expect_punct("(")?;
        let condition = self.parse_expression()?;
        self.expect_punct(")")?;
        let then_branch = Box::new(self.parse_statement_recovering()?);
        let else_branch = if self.eat_word("else") {
            Some(Box::new(self.parse_statement_recovering()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_local_declaration(&mut self) -> PResult<Stmt> {
        let start = self.peek().span;
        self.eat_word("const");
        if self.at_word("await") {
            return Err(self.unexpected("type"));
        }
        let (ty, _) = self.parse_type()?;
        let name = self.expect_ident()?;

        if self.at_punct("(") || self.at_punct("<") {
            if self.at_punct("<") {
                self.skip_angle_brackets()?;
            }
            if !self.at_punct("(") {
                return Err(self.unexpected("'('"));
            }
            self.skip_balanced()?;
            self.skip_constraints()?;
            if self.at_punct("{") {
                self.skip_balanced()?;
            } else if self.at_punct("=>") {
                self.skip_past_semicolon()?;
            } else {
                return Err(self.unexpected("'{'"));
            }
            return Ok(self.other(StatementKind::LocalFunction, start));
        }

        let initializer = if self.eat_punct("=") {
            Some(self.parse_expression()?)
        } else {
            None
        };

        if self.at_punct(",") {
            self.skip_past_semicolon()?;
            return Ok(Stmt::Malformed {
                message: "Declarations of more than one variable are not supported".to_string(),
                span: start.to(self.prev_span()),
            });
        }

        let end = self.expect_punct(";")?;
        Ok(Stmt::LocalDeclaration(LocalDeclaration {
            ty,
            name: name.text.to_string(),
            initializer,
            span: start.to(end.span),
        }))
    }

    // =========================================
    // Expressions
    // =========================================

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    /// Parses an expression body, keeping it by span when it falls outside the grammar.
    fn parse_expression_body(&mut self) -> PResult<Expr> {
        let start_pos = self.pos;
        match self.parse_expression() {
            Ok(expr) if self.at_punct(";") => return Ok(expr),
            Err(error) if self.too_deep.is_some() => return Err(error),
            _ => {}
        }
        self.pos = start_pos;
        let start = self.peek().span;
        self.skip_until_semicolon()?;
        Ok(Expr::Opaque {
            span: start.to(self.prev_span()),
        })
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> PResult<Expr> {
        if let Some(lambda) = self.parse_lambda()? {
            return Ok(lambda);
        }

        let target = self.parse_conditional()?;
        let token = self.peek();
        if token.kind == TokenKind::Punct && ASSIGNMENT_OPERATORS.contains(&token.text) {
            self.advance();
            let value = self.parse_assignment()?;
            let span = target.span().to(value.span());
            return Ok(Expr::Assignment {
                op: token.text.to_string(),
                target: Box::new(target),
                value: Box::new(value),
                span,
            });
        }
        Ok(target)
    }

    fn parse_lambda(&mut self) -> PResult<Option<Expr>> {
        let start_pos = self.pos;
        let start = self.peek().span;
        if self.at_word("async")
            && (self.peek_nth(1).kind == TokenKind::Identifier || self.peek_nth(1).is_punct("("))
        {
            self.advance();
        }

        let token = self.peek();
        let parameters = if token.kind == TokenKind::Identifier
            && !is_reserved(token.text)
            && self.peek_nth(1).is_punct("=>")
        {
            self.advance();
            vec![token.text.to_string()]
        } else if token.is_punct("(") && self.paren_group_followed_by_arrow() {
            self.parse_lambda_parameters()
        } else {
            self.pos = start_pos;
            return Ok(None);
        };

        self.expect_punct("=>")?;
        let body = if self.at_punct("{") {
            LambdaBody::Block(self.skip_balanced()?)
        } else {
            LambdaBody::Expression(Box::new(self.parse_assignment()?))
        };
        Ok(Some(Expr::Lambda {
            parameters,
            body,
            span: start.to(self.prev_span()),
        }))
    }

    fn paren_group_followed_by_arrow(&self) -> bool {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            if token.kind == TokenKind::Eof {
                return false;
            }
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    return self.peek_nth(offset + 1).is_punct("=>");
                }
            }
        }
        false
    }

    /// Collects the names of a parenthesised lambda parameter list.
    fn parse_lambda_parameters(&mut self) -> Vec<String> {
        self.advance();
        let mut names = Vec::new();
        let mut current: Option<&str> = None;
        let mut depth = 0usize;
        loop {
            let token = self.advance();
            if token.kind == TokenKind::Eof {
                break;
            }
            if token.is_punct("(") || token.is_punct("<") || token.is_punct("[") {
                depth += 1;
            } else if (token.is_punct(")") || token.is_punct(">") || token.is_punct("]")) && depth > 0 {
                depth -= 1;
            } else if depth == 0 && (token.is_punct(",") || token.is_punct(")")) {
                names.extend(current.take().map(str::to_string));
                if token.is_punct(")") {
                    break;
                }
            } else if depth == 0 && token.kind == TokenKind::Identifier {
                current = Some(token.text);
            }
        }
        names
    }

    fn parse_conditional(&mut self) -> PResult<Expr> {
        let condition = self.parse_binary(1)?;
        if !self.eat_punct("?") {
            return Ok(condition);
        }
        let when_true = self.parse_assignment()?;
        self.expect_punct(":")?;
        let when_false = self.parse_assignment()?;
        let span = condition.span().to(when_false.span());
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
            span,
        })
    }

    /// Returns `(precedence, operator, token count)` for a binary operator at the cursor.
    fn peek_binary_operator(&self) -> Option<(u8, String, usize)> {
        let token = self.peek();
        if token.is_word("is") || token.is_word("as") {
            return Some((8, token.text.to_string(), 1));
        }
        if token.kind != TokenKind::Punct {
            return None;
        }
        let next = self.peek_nth(1);
        if token.text == ">" && next.is_punct(">") && next.span.start == token.span.end {
            return Some((9, ">>".to_string(), 2));
        }
        let precedence = match token.text {
            "??" => 1,
            "||" => 2,
            "&&" => 3,
            "|" => 4,
            "^" => 5,
            "&" => 6,
            "==" | "!=" => 7,
            "<" | ">" | "<=" | ">=" => 8,
            "<<" => 9,
            "+" | "-" => 10,
            "*" | "/" | "%" => 11,
            _ => return None,
        };
        Some((precedence, token.text.to_string(), 1))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((precedence, op, width)) = self.peek_binary_operator() {
            if precedence < min_precedence {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let right = if op == "is" || op == "as" {
                self.parse_type_pattern()?
            } else {
                // `??` is right-associative
                let next_min = if op == "??" { precedence } else { precedence + 1 };
                self.parse_binary(next_min)?
            };
            let span = left.span().to(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_type_pattern(&mut self) -> PResult<Expr> {
        let start = self.peek().span;
        self.eat_word("not");
        let token = self.peek();
        if token.is_literal() || token.is_word("null") || token.is_word("true") || token.is_word("false") {
            return self.parse_primary();
        }
        if token.is_punct("{") {
            let span = self.skip_balanced()?;
            return Ok(Expr::Type {
                ty: "{ }".to_string(),
                span: start.to(span),
            });
        }
        let (ty, _) = self.parse_type()?;
        if self.peek().kind == TokenKind::Identifier && !is_reserved(self.peek().text) {
            self.advance();
        }
        Ok(Expr::Type {
            ty,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_unary_inner)
    }

    fn parse_unary_inner(&mut self) -> PResult<Expr> {
        let token = self.peek();
        if token.kind == TokenKind::Punct && PREFIX_OPERATORS.contains(&token.text) {
            self.advance();
            let operand = self.parse_unary()?;
            let span = token.span.to(operand.span());
            return Ok(Expr::Unary {
                op: token.text.to_string(),
                operand: Box::new(operand),
                span,
            });
        }
        if token.is_word("await") && !self.peek_nth(1).is_punct(";") && !self.peek_nth(1).is_punct("=") {
            self.advance();
            let operand = self.parse_unary()?;
            let span = token.span.to(operand.span());
            return Ok(Expr::Unary {
                op: "await".to_string(),
                operand: Box::new(operand),
                span,
            });
        }
        if token.is_punct("(") {
            if let Some(cast) = self.try_parse(Self::parse_cast) {
                return Ok(cast);
            }
        }
        self.parse_postfix()
    }

    fn parse_cast(&mut self) -> PResult<Expr> {
        let open = self.expect_punct("(")?;
        let (ty, _) = self.parse_type()?;
        self.expect_punct(")")?;
        let next = self.peek();
        let castable = (next.kind == TokenKind::Identifier
            && (!is_reserved(next.text)
                || ["this", "new", "true", "false", "null", "typeof", "default", "base"].contains(&next.text)))
            || next.is_literal()
            || next.is_punct("(")
            || next.is_punct("!");
        if !castable {
            return Err(self.unexpected("cast operand"));
        }
        let expr = self.parse_unary()?;
        let span = open.span.to(expr.span());
        Ok(Expr::Cast {
            ty,
            expr: Box::new(expr),
            span,
        })
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let token = self.peek();
            if token.is_punct(".") || token.is_punct("?.") {
                self.advance();
                let name = self.peek();
                if name.kind != TokenKind::Identifier {
                    return Err(self.unexpected("member name"));
                }
                self.advance();
                let span = expr.span().to(name.span);
                expr = Expr::MemberAccess {
                    target: Box::new(expr),
                    name: name.text.to_string(),
                    conditional: token.is_punct("?."),
                    span,
                };
                if self.at_punct("<") {
                    if let Some(type_arguments) = self.try_parse(Self::parse_call_type_arguments) {
                        expr = self.parse_invocation(expr, type_arguments)?;
                    }
                }
            } else if token.is_punct("(") {
                expr = self.parse_invocation(expr, Vec::new())?;
            } else if token.is_punct("[") {
                self.advance();
                let mut arguments = Vec::new();
                loop {
                    arguments.push(self.parse_argument(false)?);
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                let close = self.expect_punct("]")?;
                let span = expr.span().to(close.span);
                expr = Expr::ElementAccess {
                    target: Box::new(expr),
                    arguments,
                    span,
                };
            } else if token.is_punct("++") || token.is_punct("--") {
                self.advance();
                let span = expr.span().to(token.span);
                expr = Expr::Unary {
                    op: format!("post{}", token.text),
                    operand: Box::new(expr),
                    span,
                };
            } else if token.is_punct("!")
                && [".", "?.", "[", ")", ";", ","].iter().any(|p| self.peek_nth(1).is_punct(p))
            {
                // Null-forgiving operator
                self.advance();
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_invocation(&mut self, target: Expr, type_arguments: Vec<String>) -> PResult<Expr> {
        let arguments = self.parse_argument_list()?;
        let span = target.span().to(self.prev_span());
        Ok(Expr::Invocation(Invocation {
            target: Box::new(target),
            type_arguments,
            arguments,
            span,
        }))
    }

    fn parse_argument_list(&mut self) -> PResult<Vec<Argument>> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        if !self.at_punct(")") {
            loop {
                arguments.push(self.parse_argument(false)?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok(arguments)
    }

    fn parse_argument(&mut self, attribute: bool) -> PResult<Argument> {
        let start = self.peek().span;
        let token = self.peek();
        let next = self.peek_nth(1);
        let mut name = None;
        if token.kind == TokenKind::Identifier
            && (next.is_punct(":") || (attribute && next.is_punct("=")))
        {
            self.advance();
            self.advance();
            name = Some(token.text.to_string());
        }
        if !attribute {
            while self.at_word("ref") || self.at_word("out") || self.at_word("in") {
                self.advance();
            }
        }
        let value = self.parse_expression()?;
        Ok(Argument {
            name,
            value,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Integer | TokenKind::Real => {
                self.advance();
                Ok(literal(LiteralKind::Number, strip_numeric_suffix(token.text), token.span))
            }
            TokenKind::String | TokenKind::Char => {
                self.advance();
                Ok(literal(LiteralKind::String, decode_escapes(&token.text[1..token.text.len() - 1]), token.span))
            }
            TokenKind::VerbatimString => {
                self.advance();
                let inner = &token.text[2..token.text.len() - 1];
                Ok(literal(LiteralKind::String, inner.replace("\"\"", "\""), token.span))
            }
            TokenKind::InterpolatedString => {
                self.advance();
                Ok(literal(LiteralKind::Interpolated, token.text.to_string(), token.span))
            }
            TokenKind::Punct => match token.text {
                "(" => {
                    self.advance();
                    let inner = self.parse_expression()?;
                    let close = self.expect_punct(")")?;
                    Ok(Expr::Parenthesized {
                        inner: Box::new(inner),
                        span: token.span.to(close.span),
                    })
                }
                "[" => {
                    self.advance();
                    let elements = self.parse_elements("]")?;
                    Ok(Expr::ArrayCreation {
                        ty: None,
                        elements,
                        span: token.span.to(self.prev_span()),
                    })
                }
                _ => Err(self.unexpected("expression")),
            },
            TokenKind::Identifier => match token.text {
                "true" | "false" => {
                    self.advance();
                    Ok(literal(LiteralKind::Boolean, token.text.to_string(), token.span))
                }
                "null" => {
                    self.advance();
                    Ok(literal(LiteralKind::Null, token.text.to_string(), token.span))
                }
                "new" => self.parse_new(),
                "this" | "base" | "bool" => {
                    self.advance();
                    Ok(Expr::Name {
                        name: token.text.to_string(),
                        span: token.span,
                    })
                }
                "typeof" | "sizeof" | "nameof" | "default" | "checked" | "unchecked" => {
                    self.advance();
                    if self.at_punct("(") {
                        self.skip_balanced()?;
                    }
                    Ok(Expr::TypeOperator {
                        keyword: token.text.to_string(),
                        span: token.span.to(self.prev_span()),
                    })
                }
                text if is_reserved(text) => Err(self.unexpected("expression")),
                text => {
                    self.advance();
                    let name = Expr::Name {
                        name: text.to_string(),
                        span: token.span,
                    };
                    if self.at_punct("<") {
                        if let Some(type_arguments) = self.try_parse(Self::parse_call_type_arguments) {
                            return self.parse_invocation(name, type_arguments);
                        }
                    }
                    Ok(name)
                }
            },
            TokenKind::Eof => Err(self.unexpected("expression")),
        }
    }

    /// Parses comma-separated initializer elements up to `close`, allowing a trailing comma.
    fn parse_elements(&mut self, close: &str) -> PResult<Vec<Expr>> {
        let mut elements = Vec::new();
        while !self.at_punct(close) {
            elements.push(self.parse_initializer_value()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(close)?;
        Ok(elements)
    }

    fn parse_new(&mut self) -> PResult<Expr> {
        let start = self.expect_word("new")?.span;

        if self.at_punct("[") {
            self.skip_balanced()?;
            self.expect_punct("{")?;
            let elements = self.parse_elements("}")?;
            return Ok(Expr::ArrayCreation {
                ty: None,
                elements,
                span: start.to(self.prev_span()),
            });
        }

        let ty = if self.at_punct("{") || self.at_punct("(") {
            None
        } else {
            Some(self.parse_type()?.0)
        };

        let is_array = ty.as_deref().is_some_and(|t| t.ends_with(']')) || self.at_punct("[");
        if is_array {
            if self.at_punct("[") {
                self.skip_balanced()?;
            }
            let elements = if self.eat_punct("{") {
                self.parse_elements("}")?
            } else {
                Vec::new()
            };
            let element_type = ty.map(|t| {
                t.find('[')
                    .map_or_else(|| t.clone(), |index| t[..index].to_string())
            });
            return Ok(Expr::ArrayCreation {
                ty: element_type,
                elements,
                span: start.to(self.prev_span()),
            });
        }

        let arguments = if self.at_punct("(") {
            Some(self.parse_argument_list()?)
        } else {
            None
        };
        let initializer = if self.at_punct("{") {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        if arguments.is_none() && initializer.is_none() {
            return Err(self.unexpected("'(' or '{'"));
        }

        Ok(Expr::ObjectCreation(ObjectCreation {
            ty,
            arguments,
            initializer,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_initializer(&mut self) -> PResult<Initializer> {
        self.expect_punct("{")?;
        if self.eat_punct("}") {
            return Ok(Initializer::Object(Vec::new()));
        }

        let is_object = self.peek().kind == TokenKind::Identifier && self.peek_nth(1).is_punct("=");
        if !is_object {
            return Ok(Initializer::Collection(self.parse_elements("}")?));
        }

        let mut fields = Vec::new();
        while !self.at_punct("}") {
            let name = self.expect_ident()?;
            self.expect_punct("=")?;
            let value = self.parse_initializer_value()?;
            fields.push(FieldInitializer {
                name: name.text.to_string(),
                span: name.span.to(value.span()),
                value,
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Initializer::Object(fields))
    }

    /// Parses an initializer element, which may itself be a bare `{ ... }` initializer.
    fn parse_initializer_value(&mut self) -> PResult<Expr> {
        if !self.at_punct("{") {
            return self.parse_expression();
        }
        let start = self.peek().span;
        let initializer = self.parse_initializer()?;
        Ok(Expr::ObjectCreation(ObjectCreation {
            ty: None,
            arguments: None,
            initializer: Some(initializer),
            span: start.to(self.prev_span()),
        }))
    }
}

fn literal(kind: LiteralKind, value: String, span: Span) -> Expr {
    Expr::Literal(Literal { kind, value, span })
}

fn strip_numeric_suffix(text: &str) -> String {
    let digits = text.replace('_', "");
    let is_hex = digits.starts_with("0x") || digits.starts_with("0X");
    let suffixes: &[char] = if is_hex {
        &['u', 'U', 'l', 'L']
    } else {
        &['u', 'U', 'l', 'L', 'f', 'F', 'd', 'D', 'm', 'M']
    };
    digits.trim_end_matches(suffixes).to_string()
}

fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
