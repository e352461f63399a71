//! HTML token-stream document.
//!
//! The document is a flat list of tokens. Start tags carry a [`NodeId`] that
//! stays stable across insertions and removals, which is what relations bind
//! to. Tags that were never touched keep their source text and serialise back
//! byte for byte.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::bytes::Regex as BytesRegex;

use super::failure_at;
use crate::error::ParseFailure;

/// Stable identity of an element within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// One attribute. `value` is entity-decoded; `None` for boolean attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// A start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: NodeId,
    name: String,
    attrs: Vec<Attribute>,
    self_closing: bool,
    /// Source text, dropped as soon as the element is modified.
    raw: Option<String>,
}

impl Element {
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Lowercase tag name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    #[inline]
    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Value of attribute `name`; boolean attributes read as `""`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Set (or add) attribute `name`.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.raw = None;
        match self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.value = Some(value.to_owned()),
            None => self.attrs.push(Attribute {
                name: name.to_ascii_lowercase(),
                value: Some(value.to_owned()),
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
        let removed = self.attrs.len() != before;
        if removed {
            self.raw = None;
        }
        removed
    }

    /// Whether the whitespace-separated attribute `name` contains `token`.
    pub fn attr_contains_token(&self, name: &str, token: &str) -> bool {
        self.attr(name).is_some_and(|v| {
            v.split_ascii_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
    }

    fn render(&self, out: &mut String) {
        if let Some(raw) = &self.raw {
            out.push_str(raw);
            return;
        }
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(&attr.name);
            if let Some(value) = &attr.value {
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
        }
        out.push_str(if self.self_closing { " />" } else { ">" });
    }
}

/// An end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndTag {
    name: String,
    raw: Option<String>,
}

impl EndTag {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Comment(String),
    Doctype(String),
    Start(Element),
    End(EndTag),
    /// Body of a `<script>` or `<style>` element.
    RawText(String),
}

/// Parsed HTML document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlDocument {
    tokens: Vec<Token>,
    next_id: u32,
}

// =============================================================================
// Parsing
// =============================================================================

impl HtmlDocument {
    pub fn parse(src: &str) -> Result<Self, ParseFailure> {
        let mut doc = Self::default();
        let bytes = src.as_bytes();
        let mut pos = 0;
        let mut text_start = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'<' {
                pos += 1;
                continue;
            }
            let rest = &src[pos..];
            let next = bytes.get(pos + 1).copied();

            let is_markup = rest.starts_with("<!")
                || next == Some(b'/')
                || next.is_some_and(|b| b.is_ascii_alphabetic());
            if !is_markup {
                pos += 1;
                continue;
            }

            if text_start < pos {
                doc.tokens.push(Token::Text(src[text_start..pos].to_owned()));
            }

            if rest.starts_with("<!--") {
                let end = rest[4..]
                    .find("-->")
                    .ok_or_else(|| failure_at(src, pos, "unterminated comment"))?;
                let raw = &rest[..end + 7];
                doc.tokens.push(Token::Comment(raw.to_owned()));
                pos += raw.len();
            } else if rest.starts_with("<!") {
                let end = rest
                    .find('>')
                    .ok_or_else(|| failure_at(src, pos, "unterminated declaration"))?;
                doc.tokens.push(Token::Doctype(rest[..=end].to_owned()));
                pos += end + 1;
            } else if next == Some(b'/') {
                let end = rest
                    .find('>')
                    .ok_or_else(|| failure_at(src, pos, "unterminated end tag"))?;
                let raw = &rest[..=end];
                let name = raw[2..raw.len() - 1].trim().to_ascii_lowercase();
                doc.tokens.push(Token::End(EndTag {
                    name,
                    raw: Some(raw.to_owned()),
                }));
                pos += raw.len();
            } else {
                let end = find_tag_end(rest)
                    .ok_or_else(|| failure_at(src, pos, "unterminated start tag"))?;
                let raw = &rest[..=end];
                let element = doc.parse_start_tag(raw);
                let raw_text = is_raw_text_element(&element.name) && !element.self_closing;
                let name = element.name.clone();
                doc.tokens.push(Token::Start(element));
                pos += raw.len();

                if raw_text {
                    let body_len = find_close_tag(&src[pos..], &name).ok_or_else(|| {
                        failure_at(src, pos - raw.len(), format!("unterminated <{name}> element"))
                    })?;
                    if body_len > 0 {
                        doc.tokens
                            .push(Token::RawText(src[pos..pos + body_len].to_owned()));
                    }
                    pos += body_len;
                }
            }
            text_start = pos;
        }

        if text_start < src.len() {
            doc.tokens.push(Token::Text(src[text_start..].to_owned()));
        }
        Ok(doc)
    }

    fn parse_start_tag(&mut self, raw: &str) -> Element {
        let inner = &raw[1..raw.len() - 1];
        let name_len = inner
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(inner.len());
        let name = inner[..name_len].to_ascii_lowercase();

        let mut attr_src = inner[name_len..].trim_end();
        let self_closing = attr_src.ends_with('/');
        if self_closing {
            attr_src = &attr_src[..attr_src.len() - 1];
        }

        Element {
            id: self.allocate_id(),
            name,
            attrs: parse_attributes(attr_src),
            self_closing,
            raw: Some(raw.to_owned()),
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }
}

/// Byte offset of the `>` closing the start tag at the beginning of `rest`.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in rest.bytes().enumerate().skip(1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            (None, b'<') => return None,
            _ => {}
        }
    }
    None
}

/// Length of the raw text preceding `</name` (case-insensitive).
fn find_close_tag(rest: &str, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    let lower = rest.to_ascii_lowercase();
    lower.find(&needle)
}

/// Parse attributes from the inside of a start tag.
///
/// Input: `src="a.js" defer data-x='1'`
fn parse_attributes(s: &str) -> Vec<Attribute> {
    let mut attrs = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == '/' {
            continue;
        }

        let mut name = String::new();
        name.push(c);
        while let Some(&next) = chars.peek() {
            if next == '=' || next.is_whitespace() {
                break;
            }
            name.push(next);
            chars.next();
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let value = if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            let mut val = String::new();
            match chars.peek().copied() {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        val.push(c);
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        val.push(c);
                        chars.next();
                    }
                }
            }
            Some(unescape(&val).into_owned())
        } else {
            None
        };

        attrs.push(Attribute {
            name: name.to_ascii_lowercase(),
            value,
        });
    }

    attrs
}

// =============================================================================
// Serialisation & navigation
// =============================================================================

impl HtmlDocument {
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Text(s) | Token::Comment(s) | Token::Doctype(s) | Token::RawText(s) => {
                    out.push_str(s)
                }
                Token::Start(el) => el.render(&mut out),
                Token::End(end) => match &end.raw {
                    Some(raw) => out.push_str(raw),
                    None => {
                        out.push_str("</");
                        out.push_str(&end.name);
                        out.push('>');
                    }
                },
            }
        }
        out
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// All start tags in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Start(el) => Some(el),
            _ => None,
        })
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.elements().find(|el| el.id == id)
    }

    /// Mutable access; callers modify through [`Element`]'s setters.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.tokens.iter_mut().find_map(|t| match t {
            Token::Start(el) if el.id == id => Some(el),
            _ => None,
        })
    }

    /// Text content of the raw-text element `id` (`<script>`/`<style>`).
    pub fn raw_text(&self, id: NodeId) -> Option<&str> {
        let (start, end) = self.extent(id)?;
        self.tokens[start..=end].iter().find_map(|t| match t {
            Token::RawText(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// First element named `name`.
    pub fn first_element(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    /// Token range `[start, end]` covered by element `id`, closing tag included.
    fn extent(&self, id: NodeId) -> Option<(usize, usize)> {
        let (start, name, leaf) = self.tokens.iter().enumerate().find_map(|(i, t)| match t {
            Token::Start(el) if el.id == id => Some((
                i,
                el.name.as_str(),
                el.self_closing || is_void_element(&el.name),
            )),
            _ => None,
        })?;
        if leaf {
            return Some((start, start));
        }

        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(start + 1) {
            match token {
                Token::Start(el) if el.name == name && !el.self_closing => depth += 1,
                Token::End(end) if end.name == name => {
                    if depth == 0 {
                        return Some((start, i));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        Some((start, start))
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl HtmlDocument {
    /// Create a detached element with a fresh id.
    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Element {
        Element {
            id: self.allocate_id(),
            name: name.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(n, v)| Attribute {
                    name: n.to_ascii_lowercase(),
                    value: Some((*v).to_owned()),
                })
                .collect(),
            self_closing: false,
            raw: None,
        }
    }

    fn element_tokens(element: Element) -> Vec<Token> {
        if element.self_closing || is_void_element(&element.name) {
            return vec![Token::Start(element)];
        }
        let end = Token::End(EndTag {
            name: element.name.clone(),
            raw: None,
        });
        vec![Token::Start(element), end]
    }

    fn splice(&mut self, index: usize, element: Element) {
        let index = index.min(self.tokens.len());
        self.tokens
            .splice(index..index, Self::element_tokens(element));
    }

    /// Insert `element` right before element `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, element: Element) -> bool {
        match self.extent(anchor) {
            Some((start, _)) => {
                self.splice(start, element);
                true
            }
            None => false,
        }
    }

    /// Insert `element` right after element `anchor` (and its content).
    pub fn insert_after(&mut self, anchor: NodeId, element: Element) -> bool {
        match self.extent(anchor) {
            Some((_, end)) => {
                self.splice(end + 1, element);
                true
            }
            None => false,
        }
    }

    /// Insert `element` as the first child of the first `container`, or at
    /// the start of the document (after any doctype) when there is none.
    pub fn prepend_to(&mut self, container: &str, element: Element) {
        let index = self
            .tokens
            .iter()
            .position(|t| matches!(t, Token::Start(el) if el.name == container))
            .map(|i| i + 1)
            .unwrap_or_else(|| {
                self.tokens
                    .iter()
                    .rposition(|t| matches!(t, Token::Doctype(_)))
                    .map_or(0, |i| i + 1)
            });
        self.splice(index, element);
    }

    /// Insert `element` as the last child of the first `container`, or at the
    /// end of the document when there is none.
    pub fn append_to(&mut self, container: &str, element: Element) {
        let index = self
            .tokens
            .iter()
            .position(|t| matches!(t, Token::End(end) if end.name == container))
            .unwrap_or(self.tokens.len());
        self.splice(index, element);
    }

    /// Replace the text content of raw-text element `id`.
    pub fn set_raw_text(&mut self, id: NodeId, text: &str) -> bool {
        let Some((start, end)) = self.extent(id) else {
            return false;
        };
        if start == end {
            return false;
        }
        let existing = (start + 1..end).find(|&i| matches!(self.tokens[i], Token::RawText(_)));
        match existing {
            Some(i) => self.tokens[i] = Token::RawText(text.to_owned()),
            None => self.tokens.insert(start + 1, Token::RawText(text.to_owned())),
        }
        true
    }

    /// Remove element `id` together with its content.
    pub fn remove_element(&mut self, id: NodeId) -> bool {
        match self.extent(id) {
            Some((start, end)) => {
                self.tokens.drain(start..=end);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Charset
// =============================================================================

static META_CHARSET: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?([a-z0-9_:.\-]+)"#).expect("valid regex")
});

/// Sniff a charset label from `<meta>` tags near the start of `bytes`.
pub fn sniff_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(2048)];
    let caps = META_CHARSET.captures(head)?;
    let label = caps.get(1)?.as_bytes();
    Some(String::from_utf8_lossy(label).to_ascii_lowercase())
}

fn charset_from_content_type(content: &str) -> Option<&str> {
    let lower = content.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let value = content[idx + "charset=".len()..].trim();
    let end = value
        .find(|c: char| c == ';' || c.is_whitespace())
        .unwrap_or(value.len());
    Some(value[..end].trim_matches(['"', '\'']))
}

fn is_content_type_meta(el: &Element) -> bool {
    el.name == "meta"
        && el
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("content-type"))
}

impl HtmlDocument {
    /// Charset declared by a `<meta>` tag, lowercased.
    pub fn charset(&self) -> Option<String> {
        self.elements()
            .filter(|el| el.name == "meta")
            .find_map(|el| {
                if let Some(charset) = el.attr("charset") {
                    return Some(charset.to_ascii_lowercase());
                }
                if is_content_type_meta(el) {
                    return el
                        .attr("content")
                        .and_then(charset_from_content_type)
                        .map(str::to_ascii_lowercase);
                }
                None
            })
    }

    /// Declare `label` as the document charset.
    ///
    /// Rewrites an existing `<meta charset>` or Content-Type `<meta>`;
    /// otherwise inserts a Content-Type `<meta>` at the top of `<head>`.
    pub fn set_charset(&mut self, label: &str) {
        let content = format!("text/html; charset={label}");
        for token in &mut self.tokens {
            let Token::Start(el) = token else { continue };
            if el.name != "meta" {
                continue;
            }
            if el.has_attr("charset") {
                el.set_attr("charset", label);
                return;
            }
            if is_content_type_meta(el) {
                el.set_attr("content", &content);
                return;
            }
        }
        let meta = self.create_element(
            "meta",
            &[("http-equiv", "Content-Type"), ("content", content.as_str())],
        );
        self.prepend_to("head", meta);
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Elements whose content is not markup.
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Elements that never have a closing tag.
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Escape an attribute value for double-quoted output.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decode the common named entities and numeric character references.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse().ok(),
            };
            code.and_then(char::from_u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<!DOCTYPE html>\n<html><head>\n<link rel='stylesheet' href=a.css>\n<style>p > a { color: red }</style>\n</head><body><!-- c --><a href=\"x.html?a=1&amp;b=2\">x</a>\n<script src=\"a.js\"></script></body></html>\n";

    #[test]
    fn test_round_trip_is_byte_identical() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        assert_eq!(doc.serialize(), PAGE);
    }

    #[test]
    fn test_attributes_are_decoded() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let a = doc.first_element("a").unwrap();
        assert_eq!(a.attr("href"), Some("x.html?a=1&b=2"));
        let link = doc.first_element("link").unwrap();
        assert_eq!(link.attr("href"), Some("a.css"));
        assert!(link.attr_contains_token("rel", "stylesheet"));
    }

    #[test]
    fn test_raw_text_is_opaque() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let style = doc.first_element("style").unwrap();
        assert_eq!(doc.raw_text(style.id()), Some("p > a { color: red }"));
        assert!(doc.first_element("a").is_some());
    }

    #[test]
    fn test_modified_tag_is_rerendered() {
        let mut doc = HtmlDocument::parse("<p><img src=a.png alt=\"\"></p>").unwrap();
        let id = doc.first_element("img").unwrap().id();
        doc.element_mut(id).unwrap().set_attr("src", "b c.png");
        assert_eq!(doc.serialize(), "<p><img src=\"b c.png\" alt=\"\"></p>");
    }

    #[test]
    fn test_insert_and_remove() {
        let mut doc =
            HtmlDocument::parse("<head><link rel=stylesheet href=a.css></head>").unwrap();
        let anchor = doc.first_element("link").unwrap().id();
        let new = doc.create_element("link", &[("rel", "stylesheet"), ("href", "b.css")]);
        let new_id = new.id();
        assert!(doc.insert_before(anchor, new));
        assert_eq!(
            doc.serialize(),
            "<head><link rel=\"stylesheet\" href=\"b.css\"><link rel=stylesheet href=a.css></head>"
        );
        assert!(doc.remove_element(new_id));
        assert_eq!(doc.serialize(), "<head><link rel=stylesheet href=a.css></head>");
    }

    #[test]
    fn test_set_raw_text() {
        let mut doc = HtmlDocument::parse("<head><style>a{}</style></head>").unwrap();
        let style = doc.first_element("style").unwrap().id();
        assert!(doc.set_raw_text(style, "b{}"));
        assert_eq!(doc.serialize(), "<head><style>b{}</style></head>");

        let new = doc.create_element("script", &[]);
        let script = new.id();
        doc.append_to("head", new);
        assert!(doc.set_raw_text(script, "go()"));
        assert_eq!(doc.raw_text(script), Some("go()"));
        assert_eq!(
            doc.serialize(),
            "<head><style>b{}</style><script>go()</script></head>"
        );
    }

    #[test]
    fn test_insert_after_skips_content() {
        let mut doc = HtmlDocument::parse("<body><script>var a;</script></body>").unwrap();
        let anchor = doc.first_element("script").unwrap().id();
        let new = doc.create_element("script", &[("src", "b.js")]);
        doc.insert_after(anchor, new);
        assert_eq!(
            doc.serialize(),
            "<body><script>var a;</script><script src=\"b.js\"></script></body>"
        );
    }

    #[test]
    fn test_append_and_prepend() {
        let mut doc = HtmlDocument::parse("<html><head></head><body></body></html>").unwrap();
        let script = doc.create_element("script", &[("src", "x.js")]);
        doc.append_to("body", script);
        let link = doc.create_element("link", &[("href", "x.css")]);
        doc.prepend_to("head", link);
        assert_eq!(
            doc.serialize(),
            "<html><head><link href=\"x.css\"></head><body><script src=\"x.js\"></script></body></html>"
        );
    }

    #[test]
    fn test_unterminated_comment_has_position() {
        let err = HtmlDocument::parse("<p>\n  <!-- oops").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert_eq!(err.column, Some(3));
    }

    #[test]
    fn test_unterminated_script() {
        assert!(HtmlDocument::parse("<script>var a = 1;").is_err());
        assert!(HtmlDocument::parse("<a href=\"x").is_err());
    }

    #[test]
    fn test_lone_less_than_is_text() {
        let src = "<p>a < b</p>";
        assert_eq!(HtmlDocument::parse(src).unwrap().serialize(), src);
    }

    #[test]
    fn test_charset_read_and_write() {
        let mut doc = HtmlDocument::parse("<html><head><title>x</title></head></html>").unwrap();
        assert_eq!(doc.charset(), None);
        doc.set_charset("iso-8859-1");
        assert_eq!(doc.charset().as_deref(), Some("iso-8859-1"));
        assert!(doc.serialize().contains(
            "<head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\">"
        ));

        doc.set_charset("utf-8");
        assert_eq!(doc.charset().as_deref(), Some("utf-8"));
        assert_eq!(doc.elements().filter(|e| e.name() == "meta").count(), 1);
    }

    #[test]
    fn test_sniff_charset() {
        assert_eq!(
            sniff_charset(b"<meta charset=\"ISO-8859-1\"><p>\xe6</p>").as_deref(),
            Some("iso-8859-1")
        );
        assert_eq!(
            sniff_charset(
                b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">"
            )
            .as_deref(),
            Some("utf-8")
        );
        assert_eq!(sniff_charset(b"<p>nothing</p>"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a &amp; b &#65;&#x42; &bogus; &"), "a & b AB &bogus; &");
        assert_eq!(escape_attr("a\"b&c"), "a&quot;b&amp;c");
    }
}
