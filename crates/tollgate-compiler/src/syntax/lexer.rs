//! Lexer for the authoring language.
//!
//! [`tokenize`] converts source text into a vector of [`Token`]s ending with
//! an [`TokenKind::Eof`] token. Comments, whitespace and preprocessor lines
//! are trivia and never produce tokens.

use std::fmt;

use tollgate_core::Span;

use super::token::{Token, TokenKind, PUNCTUATION};

/// A lexical error with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.message, self.span.line)
    }
}

impl std::error::Error for LexError {}

/// Tokenizes `source`.
///
/// # Errors
///
/// Returns a [`LexError`] for unterminated literals or comments and for
/// characters that cannot start a token.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(source).tokenize()
}

/// Copies code with its trivia removed.
///
/// Tokens are rejoined with a single space wherever the original text had
/// whitespace or comments between them, so the result is independent of
/// formatting and comments. Text that does not lex is returned with
/// whitespace runs collapsed instead.
///
/// # Examples
///
/// ```rust
/// use tollgate_compiler::syntax::strip_trivia;
///
/// let code = "context.User  // who\n    .Id";
/// assert_eq!(strip_trivia(code), "context.User .Id");
/// assert_eq!(strip_trivia("a+b"), "a+b");
/// ```
#[must_use]
pub fn strip_trivia(text: &str) -> String {
    let Ok(tokens) = tokenize(text) else {
        return text.split_whitespace().collect::<Vec<_>>().join(" ");
    };

    let mut out = String::with_capacity(text.len());
    let mut previous_end: Option<u32> = None;
    for token in tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
        if let Some(end) = previous_end {
            if token.span.start > end {
                out.push(' ');
            }
        }
        out.push_str(token.text);
        previous_end = Some(token.span.end);
    }
    out
}

struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    const fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token<'src>>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.is_eof() {
                let span = self.span_from(self.offset, self.line, self.column);
                tokens.push(Token::new(TokenKind::Eof, "", span));
                return Ok(tokens);
            }
            tokens.push(self.scan_token()?);
        }
    }

    // =========================================
    // Cursor
    // =========================================

    fn rest(&self) -> &'src str {
        &self.source[self.offset..]
    }

    fn is_eof(&self) -> bool {
        self.offset >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, f: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&f) {
            self.bump();
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn span_from(&self, start: usize, line: u32, column: u32) -> Span {
        Span::new(start as u32, self.offset as u32, line, column)
    }

    fn error(&self, message: impl Into<String>, start: usize, line: u32, column: u32) -> LexError {
        LexError {
            message: message.into(),
            span: self.span_from(start, line, column),
        }
    }

    // =========================================
    // Trivia
    // =========================================

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\u{FEFF}' => {
                    self.bump();
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    self.bump_while(|c| c != '\n');
                }
                Some('/') if self.peek_nth(1) == Some('*') => {
                    let (start, line, column) = (self.offset, self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(self.error("Unterminated block comment", start, line, column));
                            }
                        }
                    }
                }
                // Preprocessor directives such as #region or #nullable
                Some('#') => self.bump_while(|c| c != '\n'),
                _ => return Ok(()),
            }
        }
    }

    // =========================================
    // Tokens
    // =========================================

    fn scan_token(&mut self) -> Result<Token<'src>, LexError> {
        let (start, line, column) = (self.offset, self.line, self.column);
        let Some(c) = self.peek() else {
            return Err(self.error("Unexpected end of input", start, line, column));
        };

        let kind = match c {
            '"' => {
                self.bump();
                self.scan_regular_string(start, line, column)?;
                TokenKind::String
            }
            '@' if self.peek_nth(1) == Some('"') => {
                self.bump();
                self.bump();
                self.scan_verbatim_string(start, line, column)?;
                TokenKind::VerbatimString
            }
            '$' | '@' if matches!(self.peek_nth(1), Some('"' | '$' | '@')) => {
                let verbatim = c == '@' || self.peek_nth(1) == Some('@');
                while matches!(self.peek(), Some('$' | '@')) {
                    self.bump();
                }
                if self.bump() != Some('"') {
                    return Err(self.error("Malformed interpolated string", start, line, column));
                }
                self.scan_interpolated_string(verbatim, start, line, column)?;
                TokenKind::InterpolatedString
            }
            '@' if self.peek_nth(1).is_some_and(is_ident_start) => {
                self.bump();
                self.bump_while(is_ident_continue);
                TokenKind::Identifier
            }
            '\'' => {
                self.bump();
                self.scan_char(start, line, column)?;
                TokenKind::Char
            }
            c if c.is_ascii_digit() => self.scan_number(),
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            c if is_ident_start(c) => {
                self.bump_while(is_ident_continue);
                TokenKind::Identifier
            }
            _ => {
                let rest = self.rest();
                let Some(punct) = PUNCTUATION.iter().find(|p| rest.starts_with(**p)) else {
                    self.bump();
                    return Err(self.error(format!("Unexpected character '{c}'"), start, line, column));
                };
                for _ in 0..punct.len() {
                    self.bump();
                }
                TokenKind::Punct
            }
        };

        let span = self.span_from(start, line, column);
        Ok(Token::new(kind, &self.source[start..self.offset], span))
    }

    fn scan_regular_string(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some('\n') | None => {
                    return Err(self.error("Unterminated string literal", start, line, column));
                }
                Some(_) => {}
            }
        }
    }

    fn scan_verbatim_string(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some(_) => {}
                None => {
                    return Err(self.error("Unterminated verbatim string literal", start, line, column));
                }
            }
        }
    }

    fn scan_interpolated_string(
        &mut self,
        verbatim: bool,
        start: usize,
        line: u32,
        column: u32,
    ) -> Result<(), LexError> {
        let mut depth = 0usize;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("Unterminated interpolated string", start, line, column));
            };
            if depth == 0 {
                match c {
                    '{' if self.peek() == Some('{') => {
                        self.bump();
                    }
                    '{' => depth = 1,
                    '"' if verbatim && self.peek() == Some('"') => {
                        self.bump();
                    }
                    '"' => return Ok(()),
                    '\\' if !verbatim => {
                        self.bump();
                    }
                    '\n' if !verbatim => {
                        return Err(self.error("Unterminated interpolated string", start, line, column));
                    }
                    _ => {}
                }
            } else {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    '"' => self.scan_regular_string(start, line, column)?,
                    '\'' => self.scan_char(start, line, column)?,
                    _ => {}
                }
            }
        }
    }

    fn scan_char(&mut self, start: usize, line: u32, column: u32) -> Result<(), LexError> {
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => return Ok(()),
                Some('\n') | None => {
                    return Err(self.error("Unterminated character literal", start, line, column));
                }
                Some(_) => {}
            }
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut real = false;

        if self.peek() == Some('0') && matches!(self.peek_nth(1), Some('x' | 'X' | 'b' | 'B')) {
            self.bump();
            self.bump();
            self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
            self.bump_while(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
            return TokenKind::Integer;
        }

        self.bump_while(|c| c.is_ascii_digit() || c == '_');
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            real = true;
            self.bump();
            self.bump_while(|c| c.is_ascii_digit() || c == '_');
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                real = true;
                for _ in 0..digit_at {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
        if matches!(self.peek(), Some('f' | 'F' | 'd' | 'D' | 'm' | 'M')) {
            real = true;
            self.bump();
        } else {
            self.bump_while(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
        }

        if real {
            TokenKind::Real
        } else {
            TokenKind::Integer
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn test_tokenize_call() {
        let tokens = kinds(r#"context.SetHeader("X-Trace", "1");"#);
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            texts,
            vec!["context", ".", "SetHeader", "(", "\"X-Trace\"", ",", "\"1\"", ")", ";"]
        );
        assert_eq!(tokens[4].0, TokenKind::String);
    }

    #[test]
    fn test_comments_and_directives_are_trivia() {
        let tokens = kinds("#region x\n// line\na /* block */ b\n#endregion");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Identifier, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("42 1.5 2e10 3m 0xFF 10L");
        let kinds: Vec<_> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Integer,
                TokenKind::Real,
                TokenKind::Real,
                TokenKind::Real,
                TokenKind::Integer,
                TokenKind::Integer
            ]
        );
    }

    #[test]
    fn test_member_access_on_integer_is_not_real() {
        let tokens = kinds("1.ToString()");
        assert_eq!(tokens[0], (TokenKind::Integer, "1".to_string()));
        assert_eq!(tokens[1], (TokenKind::Punct, ".".to_string()));
    }

    #[test]
    fn test_string_flavours() {
        let tokens = kinds(r#"@"C:\dir""x" $"{a["k"]}-{{b}}" $@"{c}""" '\''"#);
        let kinds: Vec<_> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::VerbatimString,
                TokenKind::InterpolatedString,
                TokenKind::InterpolatedString,
                TokenKind::Char
            ]
        );
    }

    #[test]
    fn test_operators_match_longest() {
        let tokens = kinds("a ?? b => c?.d != e");
        let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["a", "??", "b", "=>", "c", "?.", "d", "!=", "e"]);
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
        assert_eq!((tokens[1].span.start, tokens[1].span.end), (4, 5));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(err.message.contains("Unterminated string"));
    }

    #[test]
    fn test_strip_trivia_collapses_layout() {
        let code = "context.Request\n        .Headers /* h */ .GetValueOrDefault(\"x\",  \"\")";
        assert_eq!(
            strip_trivia(code),
            "context.Request .Headers .GetValueOrDefault(\"x\", \"\")"
        );
    }

    #[test]
    fn test_strip_trivia_keeps_string_contents() {
        assert_eq!(strip_trivia("f(\"a  // b\")"), "f(\"a  // b\")");
    }
}
