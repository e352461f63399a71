//! Structured forms of the text asset types.
//!
//! | Module     | Structured form                                  |
//! |------------|--------------------------------------------------|
//! | `html`     | token stream with stable element ids              |
//! | `css`      | lightningcss sheet with stable import/url ids     |
//! | `js`       | oxc-validated source, minified or re-printed      |
//! | `encoding` | byte <-> text conversion                          |
//!
//! Json uses `serde_json::Value` directly.

pub mod css;
pub mod encoding;
pub mod html;
pub mod js;

pub use css::Stylesheet;
pub use encoding::Encoding;
pub use html::HtmlDocument;
pub use js::JsSource;

use crate::error::ParseFailure;

/// 1-based line and column of byte `offset` in `src`.
pub(crate) fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(src.len());
    while !src.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Parse failure positioned at byte `offset` of `src`.
pub(crate) fn failure_at(src: &str, offset: usize, message: impl Into<String>) -> ParseFailure {
    let (line, column) = line_col(src, offset);
    ParseFailure::new(message).at(line, column)
}

/// Parse a JSON document, keeping serde_json's error position.
pub fn parse_json(src: &str) -> Result<serde_json::Value, ParseFailure> {
    serde_json::from_str(src)
        .map_err(|e| ParseFailure::new(format!("{e}")).at(e.line(), e.column()))
}

/// Serialise a JSON document.
///
/// Pretty output uses four-space indentation and ends with a newline.
pub fn print_json(value: &serde_json::Value, pretty: bool) -> String {
    if !pretty {
        return value.to_string();
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    // Serialising a Value into memory cannot fail.
    if serde::Serialize::serialize(value, &mut ser).is_err() {
        return value.to_string();
    }
    let mut out = String::from_utf8(buf).unwrap_or_else(|_| value.to_string());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (2, 2));
        assert_eq!(line_col(src, 100), (3, 3));
    }

    #[test]
    fn test_json_pretty_and_compact() {
        let value = parse_json(r#"{"b": 1, "a": [1, 2]}"#).unwrap();
        assert_eq!(print_json(&value, false), r#"{"b":1,"a":[1,2]}"#);
        assert_eq!(
            print_json(&value, true),
            "{\n    \"b\": 1,\n    \"a\": [\n        1,\n        2\n    ]\n}\n"
        );
    }

    #[test]
    fn test_json_error_position() {
        let err = parse_json("{\n  \"a\": }").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.column.is_some());
    }
}
