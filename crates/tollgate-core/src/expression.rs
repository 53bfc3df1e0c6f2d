//! Inline expression encoding.
//!
//! Values computed by host code at gateway execution time travel through the
//! compiler as ordinary strings prefixed with [`INLINE_EXPRESSION_MARKER`].
//! The marker is only removed by the XML writer, which then emits the text
//! raw instead of escaping it.

/// Sentinel prefix for inline expression text.
///
/// `U+0001` is not a legal XML 1.0 character, so it never appears in literal
/// configuration data.
pub const INLINE_EXPRESSION_MARKER: char = '\u{1}';

/// Wraps single-expression code as an inline expression: `@(code)`.
///
/// # Examples
///
/// ```rust
/// use tollgate_core::expression::{inline_expression, strip_marker};
///
/// let value = inline_expression("context.User.Id");
/// assert_eq!(strip_marker(&value), Some("@(context.User.Id)"));
/// ```
#[must_use]
pub fn inline_expression(code: &str) -> String {
    format!("{INLINE_EXPRESSION_MARKER}@({code})")
}

/// Wraps statement-block code as an inline expression: `@{code}`.
#[must_use]
pub fn inline_block(code: &str) -> String {
    format!("{INLINE_EXPRESSION_MARKER}@{{{code}}}")
}

/// Returns true if the value carries the inline expression marker.
#[must_use]
pub fn is_inline(value: &str) -> bool {
    value.starts_with(INLINE_EXPRESSION_MARKER)
}

/// Returns the raw text of a marked value, or `None` for plain literals.
#[must_use]
pub fn strip_marker(value: &str) -> Option<&str> {
    value.strip_prefix(INLINE_EXPRESSION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_block_wraps_in_braces() {
        let value = inline_block("return 1;");
        assert!(is_inline(&value));
        assert_eq!(strip_marker(&value), Some("@{return 1;}"));
    }

    #[test]
    fn test_plain_literals_are_not_inline() {
        assert!(!is_inline("@(looks like code)"));
        assert_eq!(strip_marker("plain"), None);
    }
}
