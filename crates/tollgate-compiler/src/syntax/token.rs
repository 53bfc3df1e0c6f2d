//! Tokens of the authoring language.

use std::fmt;

use tollgate_core::Span;

/// A token borrowed from the source text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token.
    pub text: &'src str,
    /// Location in source.
    pub span: Span,
}

impl<'src> Token<'src> {
    /// Creates a token.
    #[must_use]
    pub const fn new(kind: TokenKind, text: &'src str, span: Span) -> Self {
        Self { kind, text, span }
    }

    /// Returns true if this is the punctuation or operator `p`.
    #[must_use]
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Returns true if this is the identifier or keyword `word`.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == word
    }

    /// Returns true if this token is a literal of any kind.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Integer
                | TokenKind::Real
                | TokenKind::String
                | TokenKind::VerbatimString
                | TokenKind::InterpolatedString
                | TokenKind::Char
        )
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {}:{})", self.kind, self.text, self.span.line, self.span.column)
    }
}

/// Token categories.
///
/// Keywords are lexed as identifiers; the parser decides from context
/// whether a word is reserved, which keeps contextual keywords such as `var`
/// usable as names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword, including `@`-escaped identifiers.
    Identifier,
    /// Integer literal: `42`, `0xFF`, `10L`
    Integer,
    /// Real literal: `1.5`, `2e10`, `3m`
    Real,
    /// Regular string literal: `"a\tb"`
    String,
    /// Verbatim string literal: `@"C:\path"`
    VerbatimString,
    /// Interpolated string literal: `$"{a}-{b}"`
    InterpolatedString,
    /// Character literal: `'x'`
    Char,
    /// Punctuation or operator.
    Punct,
    /// End of input.
    Eof,
}

/// Words that can never be used as plain identifiers in expressions.
pub const RESERVED: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "case", "catch", "class", "const", "continue",
    "default", "do", "else", "enum", "event", "false", "finally", "for", "foreach", "goto", "if",
    "in", "interface", "internal", "is", "lock", "namespace", "new", "null", "operator", "out",
    "override", "private", "protected", "public", "readonly", "ref", "return", "sealed", "static",
    "struct", "switch", "this", "throw", "true", "try", "typeof", "using", "virtual", "void",
    "while",
];

/// Returns true if `word` is reserved.
#[must_use]
pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Operators and punctuation, longest first so the lexer can match greedily.
pub const PUNCTUATION: &[&str] = &[
    "<<=", "??=", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "<<", "??", "?.", "::", "{", "}", "(", ")", "[", "]", ";", ",",
    ".", ":", "?", "=", "<", ">", "+", "-", "*", "/", "%", "!", "~", "&", "|", "^",
];
