//! Escaping text for embedding inside javascript string literals.
//!
//! The result is safe inside single- or double-quoted literals and inside
//! inline `<script>` blocks: quotes, backslashes, HTML-significant characters,
//! the javascript line terminators U+2028/U+2029 and all C0 control
//! characters are replaced by `\uXXXX` sequences.

use std::fmt::Write;

/// Escape `value` so it can be embedded in a javascript string literal.
///
/// Runs in a single pass, so the backslash of an inserted escape sequence is
/// never escaped a second time.
///
/// ```ignore
/// assert_eq!(escape("a'b"), "a\\u0027b");
/// ```
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '\'' | '"' | '>' | '<' | '&' | '=' | '-' | ';' | '\u{2028}' | '\u{2029}'
            | '\u{0}'..='\u{1f}' => {
                // Writing into a String cannot fail.
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Whether `c` would be rewritten by [`escape`].
pub fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '\\' | '\'' | '"' | '>' | '<' | '&' | '=' | '-' | ';' | '\u{2028}' | '\u{2029}'
            | '\u{0}'..='\u{1f}'
    )
}
