//! CSS stylesheets, parsed and printed with lightningcss.
//!
//! A [`Stylesheet`] keeps source text that lightningcss has accepted, plus an
//! index of the nodes relations bind to: every top-level `@import` and every
//! `url()` anywhere else (nested `@media` / `@supports` blocks, `@font-face`
//! sources, unknown properties). Each indexed node gets a stable id on parse.
//!
//! Edits re-parse the source, change the rule list through a visitor and
//! print it back. The visitor walks the rule list in the same order every
//! time, so the n-th `url()` it meets is always the n-th entry of the index.
//!
//! `@charset` is dropped by lightningcss, so it is tracked on the side.

use std::convert::Infallible;
use std::ops::Range;
use std::sync::LazyLock;

use lightningcss::declaration::DeclarationBlock;
use lightningcss::dependencies::{Dependency, DependencyOptions};
use lightningcss::properties::Property;
use lightningcss::rules::font_face::{FontFaceProperty, FontFaceRule, Source};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;
use lightningcss::values::url::Url;
use lightningcss::visitor::{Visit, VisitTypes, Visitor};
use regex::Regex;

use crate::error::ParseFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImportId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UrlId(u32);

/// A top-level `@import` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    id: ImportId,
    pub href: String,
    /// Media query list, empty when absent.
    pub media: String,
}

impl Import {
    #[inline]
    pub fn id(&self) -> ImportId {
        self.id
    }
}

/// A `url()` outside `@import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    id: UrlId,
    /// Declaration holding the url; `None` inside `@font-face` descriptors
    /// and at-rule preludes.
    pub property: Option<String>,
    pub href: String,
}

impl UrlRef {
    #[inline]
    pub fn id(&self) -> UrlId {
        self.id
    }
}

/// Parsed stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    source: String,
    charset: Option<String>,
    imports: Vec<Import>,
    urls: Vec<UrlRef>,
    next_id: u32,
}

// =============================================================================
// Parsing & printing
// =============================================================================

static CHARSET_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\u{FEFF}?\s*@charset\s*["']([^"']*)["']\s*;"#).expect("valid regex")
});

fn parse_sheet(src: &str) -> Result<StyleSheet<'_>, ParseFailure> {
    StyleSheet::parse(src, ParserOptions::default()).map_err(|err| {
        let failure = ParseFailure::new(err.kind.to_string());
        match err.loc {
            Some(loc) => failure.at(loc.line as usize + 1, loc.column as usize),
            None => failure,
        }
    })
}

/// Print `rules`; every url goes through [`url_token`].
fn print_sheet(sheet: &StyleSheet<'_>, minify: bool) -> Option<String> {
    let options = PrinterOptions {
        minify,
        analyze_dependencies: Some(DependencyOptions {
            remove_imports: false,
        }),
        ..PrinterOptions::default()
    };
    let result = sheet.to_css(options).ok()?;
    let mut code = result.code;
    for dependency in result.dependencies.unwrap_or_default() {
        let (placeholder, url) = match &dependency {
            Dependency::Url(dep) => (format!("url(\"{}\")", dep.placeholder), &dep.url),
            Dependency::Import(dep) => (format!("\"{}\"", dep.placeholder), &dep.url),
        };
        code = code.replacen(&placeholder, &url_token(url), 1);
    }
    Some(code)
}

impl Stylesheet {
    pub fn parse(src: &str) -> Result<Self, ParseFailure> {
        // Blank out `@charset` instead of cutting it so error positions hold.
        let (charset, source) = match CHARSET_RULE.captures(src) {
            Some(caps) => {
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                let label = caps.get(1).map(|m| m.as_str().to_owned());
                let blank: String = src[whole.clone()]
                    .chars()
                    .map(|c| if c == '\n' { '\n' } else { ' ' })
                    .collect();
                (label, format!("{blank}{}", &src[whole.end..]))
            }
            None => (None, src.to_owned()),
        };

        let (imports, urls) = {
            let mut sheet = parse_sheet(&source)?;
            (collect_imports(&sheet.rules), collect_urls(&mut sheet.rules))
        };

        let mut stylesheet = Self {
            source,
            charset,
            ..Self::default()
        };
        stylesheet.imports = imports
            .into_iter()
            .map(|(href, media)| Import {
                id: ImportId(stylesheet.bump()),
                href,
                media,
            })
            .collect();
        stylesheet.urls = urls
            .into_iter()
            .map(|(property, href)| UrlRef {
                id: UrlId(stylesheet.bump()),
                property,
                href,
            })
            .collect();
        Ok(stylesheet)
    }

    fn bump(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Compact (minified) or pretty (indented, trailing newline) text.
    pub fn serialize(&self, pretty: bool) -> String {
        let printed = parse_sheet(&self.source)
            .ok()
            .and_then(|sheet| print_sheet(&sheet, !pretty))
            .unwrap_or_else(|| self.source.trim().to_owned());

        let mut out = String::with_capacity(printed.len() + 24);
        if let Some(charset) = &self.charset {
            out.push_str("@charset \"");
            out.push_str(charset);
            out.push_str("\";");
            if pretty {
                out.push('\n');
            }
        }
        out.push_str(&printed);
        if pretty && !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// Re-parse the source, let `apply` edit the rule list and store the
    /// printed result. `snippet`, when not empty, is parsed alongside and
    /// handed over so its nodes can be moved into the sheet.
    fn rewrite<F>(&mut self, snippet: &str, apply: F) -> bool
    where
        F: for<'i> FnOnce(&mut CssRuleList<'i>, Option<&mut CssRuleList<'i>>) -> bool,
    {
        let source = self.source.clone();
        let mut extra = if snippet.is_empty() {
            None
        } else {
            match parse_sheet(snippet) {
                Ok(sheet) => Some(sheet),
                Err(_) => return false,
            }
        };
        let Ok(mut sheet) = parse_sheet(&source) else {
            return false;
        };
        if !apply(&mut sheet.rules, extra.as_mut().map(|s| &mut s.rules)) {
            return false;
        }
        match sheet.to_css(PrinterOptions::default()) {
            Ok(result) => {
                self.source = result.code;
                true
            }
            Err(_) => false,
        }
    }
}

fn collect_imports(rules: &CssRuleList<'_>) -> Vec<(String, String)> {
    rules
        .0
        .iter()
        .filter_map(|rule| match rule {
            CssRule::Import(import) => {
                let media = if import.media.media_queries.is_empty() {
                    String::new()
                } else {
                    import
                        .media
                        .to_css_string(PrinterOptions::default())
                        .unwrap_or_default()
                };
                Some((import.url.to_string(), media))
            }
            _ => None,
        })
        .collect()
}

fn collect_urls(rules: &mut CssRuleList<'_>) -> Vec<(Option<String>, String)> {
    let mut found = Vec::new();
    let mut walker = Walker::new(usize::MAX, Mode::Collect(&mut found));
    let _ = rules.visit(&mut walker);
    found
}

/// Position of the `n`-th `@import` in the rule list.
fn nth_import(rules: &CssRuleList<'_>, n: usize) -> Option<usize> {
    rules
        .0
        .iter()
        .enumerate()
        .filter(|(_, rule)| matches!(rule, CssRule::Import(_)))
        .map(|(index, _)| index)
        .nth(n)
}

// =============================================================================
// Url walker
// =============================================================================

/// What the walker does when it reaches the target url.
enum Mode<'r, 'i> {
    Collect(&'r mut Vec<(Option<String>, String)>),
    Set(&'r str),
    Locate(&'r mut Option<Located>),
    Remove(Removal<'i>),
}

/// Where the target url lives, found before removing it.
enum Located {
    /// Inside a declaration, printed as `text`; `token` counts its urls.
    Declaration { text: String, token: usize },
    /// A `@font-face` source.
    Source,
    Other,
}

enum Removal<'i> {
    /// The declaration or font source holding the url goes.
    Drop,
    /// The declaration is replaced by one without the url.
    Replace(Property<'i>),
    /// Leave the node, empty the url.
    Blank,
}

/// Counts urls in one node.
#[derive(Default)]
struct UrlCounter(usize);

impl<'i> Visitor<'i> for UrlCounter {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        VisitTypes::URLS
    }

    fn visit_url(&mut self, _url: &mut Url<'i>) -> Result<(), Self::Error> {
        self.0 += 1;
        Ok(())
    }
}

fn property_urls(property: &mut Property<'_>) -> usize {
    let mut counter = UrlCounter::default();
    let _ = <Property<'_> as Visit<'_, _, UrlCounter>>::visit(property, &mut counter);
    counter.0
}

fn descriptor_urls(property: &mut FontFaceProperty<'_>) -> usize {
    let mut counter = UrlCounter::default();
    let _ = <FontFaceProperty<'_> as Visit<'_, _, UrlCounter>>::visit(property, &mut counter);
    counter.0
}

/// Walks every url outside `@import` in a fixed order, acting on the
/// `target`-th one.
struct Walker<'r, 'i> {
    target: usize,
    seen: usize,
    property: Option<String>,
    mode: Mode<'r, 'i>,
    /// Set once the target was handled; `true` if its node is gone.
    removed: Option<bool>,
}

impl<'r, 'i> Walker<'r, 'i> {
    fn new(target: usize, mode: Mode<'r, 'i>) -> Self {
        Self {
            target,
            seen: 0,
            property: None,
            mode,
            removed: None,
        }
    }

    fn passes_through(&self) -> bool {
        matches!(self.mode, Mode::Collect(_) | Mode::Set(_))
    }

    fn is_hit(&self, count: usize) -> bool {
        self.removed.is_none() && (self.seen..self.seen + count).contains(&self.target)
    }

    fn visit_declarations(&mut self, list: &mut Vec<Property<'i>>, important: bool) {
        let mut i = 0;
        while i < list.len() {
            let count = property_urls(&mut list[i]);
            if self.passes_through() || !self.is_hit(count) {
                if self.passes_through() {
                    self.property = Some(list[i].property_id().name().to_ascii_lowercase());
                    let _ = <Property<'i> as Visit<'i, _, Self>>::visit(&mut list[i], self);
                    self.property = None;
                } else {
                    self.seen += count;
                }
                i += 1;
                continue;
            }

            let token = self.target - self.seen;
            let removal = match &mut self.mode {
                Mode::Locate(found) => {
                    let text = list[i]
                        .to_css_string(important, PrinterOptions::default())
                        .unwrap_or_default();
                    **found = Some(Located::Declaration { text, token });
                    self.removed = Some(false);
                    None
                }
                Mode::Remove(removal) => Some(std::mem::replace(removal, Removal::Blank)),
                Mode::Collect(_) | Mode::Set(_) => None,
            };
            let removal = match removal {
                Some(Removal::Replace(mut property)) => {
                    if property_urls(&mut property) + 1 == count {
                        Some(Removal::Replace(property))
                    } else {
                        Some(Removal::Blank)
                    }
                }
                other => other,
            };
            match removal {
                Some(Removal::Drop) => {
                    list.remove(i);
                    self.seen += count;
                    self.removed = Some(true);
                    continue;
                }
                Some(Removal::Replace(property)) => {
                    list[i] = property;
                    self.seen += count;
                    self.removed = Some(true);
                }
                Some(_) => {
                    // Blank in place; visit_url empties the target.
                    let _ = <Property<'i> as Visit<'i, _, Self>>::visit(&mut list[i], self);
                    self.removed = Some(false);
                }
                None => self.seen += count,
            }
            i += 1;
        }
    }

    fn visit_font_face(&mut self, face: &mut FontFaceRule<'i>) {
        let mut i = 0;
        while i < face.properties.len() {
            let count = descriptor_urls(&mut face.properties[i]);
            if self.passes_through() || !self.is_hit(count) {
                if self.passes_through() {
                    let _ = <FontFaceProperty<'i> as Visit<'i, _, Self>>::visit(
                        &mut face.properties[i],
                        self,
                    );
                } else {
                    self.seen += count;
                }
                i += 1;
                continue;
            }

            let token = self.target - self.seen;
            if let Mode::Locate(found) = &mut self.mode {
                **found = Some(Located::Source);
                self.removed = Some(false);
                self.seen += count;
                i += 1;
                continue;
            }

            let emptied = match &mut face.properties[i] {
                FontFaceProperty::Source(sources) => {
                    let position = sources
                        .iter()
                        .enumerate()
                        .filter(|(_, source)| matches!(source, Source::Url(_)))
                        .map(|(index, _)| index)
                        .nth(token);
                    if let Some(position) = position {
                        sources.remove(position);
                    }
                    sources.is_empty()
                }
                _ => true,
            };
            if emptied {
                face.properties.remove(i);
            } else {
                i += 1;
            }
            self.seen += count;
            self.removed = Some(true);
        }
    }
}

impl<'i> Visitor<'i> for Walker<'_, 'i> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        VisitTypes::RULES | VisitTypes::PROPERTIES | VisitTypes::URLS
    }

    fn visit_rule(&mut self, rule: &mut CssRule<'i>) -> Result<(), Self::Error> {
        match rule {
            CssRule::Import(_) => Ok(()),
            CssRule::FontFace(face) => {
                self.visit_font_face(face);
                Ok(())
            }
            _ => rule.visit_children(self),
        }
    }

    fn visit_declaration_block(&mut self, block: &mut DeclarationBlock<'i>) -> Result<(), Self::Error> {
        self.visit_declarations(&mut block.declarations, false);
        self.visit_declarations(&mut block.important_declarations, true);
        Ok(())
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        let index = self.seen;
        self.seen += 1;
        match &mut self.mode {
            Mode::Collect(found) => found.push((self.property.clone(), url.url.to_string())),
            Mode::Set(href) if index == self.target => url.url = (*href).to_owned().into(),
            Mode::Locate(found) if index == self.target && self.removed.is_none() => {
                **found = Some(Located::Other);
                self.removed = Some(false);
            }
            Mode::Remove(_) if index == self.target => {
                url.url = String::new().into();
                self.removed.get_or_insert(false);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Drop the `token`-th url from a printed declaration. When the value is a
/// comma-separated list, the whole item holding the url goes. `None` when no
/// url would be left.
fn remove_url_item(declaration: &str, token: usize) -> Option<String> {
    let tokens = url_tokens(declaration);
    if tokens.len() <= 1 {
        return None;
    }
    let target = tokens.get(token)?.range.clone();
    let value_start = declaration.find(':').map_or(0, |i| i + 1);
    let items = split_top_level(declaration, value_start);

    let cut = match items.iter().position(|item| item.contains(&target.start)) {
        Some(index) if items.len() > 1 => {
            let item = &items[index];
            let only_this = tokens
                .iter()
                .filter(|t| item.contains(&t.range.start))
                .count()
                == 1;
            if only_this {
                // Take the separating comma with the item.
                if index + 1 < items.len() {
                    item.start..items[index + 1].start
                } else {
                    items[index - 1].end..item.end
                }
            } else {
                target
            }
        }
        _ => target,
    };

    let mut out = String::with_capacity(declaration.len());
    out.push_str(&declaration[..cut.start]);
    out.push_str(&declaration[cut.end..]);
    Some(out)
}

/// Byte ranges of the comma-separated items of `s[start..]`, outside
/// strings and parentheses.
fn split_top_level(s: &str, start: usize) -> Vec<Range<usize>> {
    let bytes = s.as_bytes();
    let mut items = Vec::new();
    let mut item_start = start;
    let mut depth = 0usize;
    let mut quote = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    items.push(item_start..i);
                    item_start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    items.push(item_start..s.len());
    items
}

/// The single declaration of a `.x{...}` snippet.
fn take_declaration<'i>(rules: &mut CssRuleList<'i>) -> Option<Property<'i>> {
    let CssRule::Style(rule) = rules.0.first_mut()? else {
        return None;
    };
    let block = &mut rule.declarations;
    if block.declarations.len() + block.important_declarations.len() != 1 {
        return None;
    }
    block
        .declarations
        .pop()
        .or_else(|| block.important_declarations.pop())
}

// =============================================================================
// url() tokens
// =============================================================================

static SAFE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9/_.\-]*$").expect("valid regex"));

/// Render `url` as a CSS `url()` token.
///
/// Urls made only of safe characters stay unquoted; anything else is
/// single-quoted with quotes backslash-escaped.
pub fn url_token(url: &str) -> String {
    if SAFE_URL.is_match(url) {
        format!("url({url})")
    } else {
        let escaped = url.replace('\'', "\\'").replace('"', "\\\"");
        format!("url('{escaped}')")
    }
}

/// A `url(...)` occurrence inside printed CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlToken {
    /// Byte range of the whole token, `url(` through `)`.
    pub range: Range<usize>,
    pub url: String,
}

/// Parse the `url(...)` token starting at byte `start` of `s`.
fn parse_url_token(s: &str, start: usize) -> Option<UrlToken> {
    let head = s.get(start..start + 4)?;
    if !head.eq_ignore_ascii_case("url(") {
        return None;
    }
    let bytes = s.as_bytes();
    let mut i = start + 4;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let mut url = String::new();
    match bytes.get(i).copied() {
        Some(quote @ (b'"' | b'\'')) => {
            i += 1;
            loop {
                let c = s[i..].chars().next()?;
                i += c.len_utf8();
                match c {
                    '\\' => {
                        let next = s[i..].chars().next()?;
                        i += next.len_utf8();
                        url.push(next);
                    }
                    c if c as u32 == u32::from(quote) => break,
                    c => url.push(c),
                }
            }
        }
        _ => {
            let end = s[i..]
                .find(|c: char| c == ')' || c.is_ascii_whitespace())
                .map(|e| i + e)?;
            url.push_str(&s[i..end]);
            i = end;
        }
    }
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    (bytes.get(i) == Some(&b')')).then(|| UrlToken {
        range: start..i + 1,
        url,
    })
}

/// All `url()` tokens in `value`, in order.
pub fn url_tokens(value: &str) -> Vec<UrlToken> {
    let bytes = value.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b'u' | b'U' => {
                let boundary = i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'-');
                match boundary.then(|| parse_url_token(value, i)).flatten() {
                    Some(token) => {
                        i = token.range.end;
                        tokens.push(token);
                    }
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    tokens
}

// =============================================================================
// Access & mutation
// =============================================================================

impl Stylesheet {
    /// Top-level `@import` rules in order.
    #[inline]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Every other `url()` in walk order.
    #[inline]
    pub fn urls(&self) -> &[UrlRef] {
        &self.urls
    }

    pub fn import(&self, id: ImportId) -> Option<&Import> {
        self.imports.iter().find(|i| i.id == id)
    }

    pub fn import_index(&self, id: ImportId) -> Option<usize> {
        self.imports.iter().position(|i| i.id == id)
    }

    pub fn url(&self, id: UrlId) -> Option<&UrlRef> {
        self.urls.iter().find(|u| u.id == id)
    }

    fn url_index(&self, id: UrlId) -> Option<usize> {
        self.urls.iter().position(|u| u.id == id)
    }

    /// Point `@import` `id` at `href`.
    pub fn set_import_href(&mut self, id: ImportId, href: &str) -> bool {
        let Some(index) = self.import_index(id) else {
            return false;
        };
        let changed = self.rewrite("", |rules, _| {
            let Some(position) = nth_import(rules, index) else {
                return false;
            };
            match &mut rules.0[position] {
                CssRule::Import(import) => {
                    import.url = href.to_owned().into();
                    true
                }
                _ => false,
            }
        });
        if changed {
            self.imports[index].href = href.to_owned();
        }
        changed
    }

    /// Point `url()` `id` at `href`.
    pub fn set_url_href(&mut self, id: UrlId, href: &str) -> bool {
        let Some(index) = self.url_index(id) else {
            return false;
        };
        let changed = self.rewrite("", |rules, _| {
            let mut walker = Walker::new(index, Mode::Set(href));
            let _ = rules.visit(&mut walker);
            walker.seen > index
        });
        if changed {
            self.urls[index].href = href.to_owned();
        }
        changed
    }

    /// Insert a new `@import` so it becomes the `index`-th one.
    pub fn insert_import(&mut self, index: usize, href: &str, media: &str) -> Option<ImportId> {
        let index = index.min(self.imports.len());
        let snippet = if media.is_empty() {
            format!("@import {};", url_token(href))
        } else {
            format!("@import {} {media};", url_token(href))
        };
        let inserted = self.rewrite(&snippet, |rules, extra| {
            let Some(extra) = extra else {
                return false;
            };
            if !matches!(extra.0.first(), Some(CssRule::Import(_))) {
                return false;
            }
            let rule = extra.0.remove(0);
            let position = match nth_import(rules, index) {
                Some(position) => position,
                None => match index.checked_sub(1).and_then(|last| nth_import(rules, last)) {
                    Some(last) => last + 1,
                    None => 0,
                },
            };
            rules.0.insert(position, rule);
            true
        });
        if !inserted {
            return None;
        }
        let id = ImportId(self.bump());
        self.imports.insert(
            index,
            Import {
                id,
                href: href.to_owned(),
                media: media.to_owned(),
            },
        );
        Some(id)
    }

    pub fn remove_import(&mut self, id: ImportId) -> bool {
        let Some(index) = self.import_index(id) else {
            return false;
        };
        let removed = self.rewrite("", |rules, _| match nth_import(rules, index) {
            Some(position) => {
                rules.0.remove(position);
                true
            }
            None => false,
        });
        if removed {
            self.imports.remove(index);
        }
        removed
    }

    /// Remove `url()` `id` from its declaration, leaving any other url of
    /// the same declaration in place. The declaration itself goes once it
    /// holds no url.
    pub fn remove_url(&mut self, id: UrlId) -> bool {
        let Some(index) = self.url_index(id) else {
            return false;
        };

        let mut located = None;
        if let Ok(mut sheet) = parse_sheet(&self.source) {
            let mut walker = Walker::new(index, Mode::Locate(&mut located));
            let _ = sheet.rules.visit(&mut walker);
        }
        let (snippet, drop) = match located {
            Some(Located::Declaration { text, token }) => match remove_url_item(&text, token) {
                Some(reduced) => (format!(".x{{{reduced}}}"), false),
                None => (String::new(), true),
            },
            Some(Located::Source) => (String::new(), true),
            Some(Located::Other) => (String::new(), false),
            None => return false,
        };

        let mut removed = false;
        let changed = self.rewrite(&snippet, |rules, extra| {
            let removal = if drop {
                Removal::Drop
            } else {
                extra
                    .and_then(take_declaration)
                    .map_or(Removal::Blank, Removal::Replace)
            };
            let mut walker = Walker::new(index, Mode::Remove(removal));
            let _ = rules.visit(&mut walker);
            removed = walker.removed == Some(true);
            walker.removed.is_some()
        });
        if !changed {
            return false;
        }
        if removed {
            self.urls.remove(index);
        } else {
            self.urls[index].href.clear();
        }
        true
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Rewrite an existing `@charset` rule. Sheets without one are left alone.
    pub fn set_charset(&mut self, label: &str) -> bool {
        match &mut self.charset {
            Some(charset) => {
                *charset = label.to_owned();
                true
            }
            None => false,
        }
    }
}

/// Sniff a leading `@charset "...";` from raw bytes.
pub fn sniff_charset(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let rest = bytes.strip_prefix(b"@charset \"")?;
    let end = rest.iter().take(64).position(|&b| b == b'"')?;
    Some(String::from_utf8_lossy(&rest[..end]).to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(sheet: &Stylesheet) -> Vec<&str> {
        sheet.urls().iter().map(|u| u.href.as_str()).collect()
    }

    #[test]
    fn test_parse_index() {
        let sheet = Stylesheet::parse(
            "@charset \"utf-8\";\n@import url(\"reset.css\") screen;\n/* hi */\nbody { color: red; background-image: url(bg.png) }\n.x{behavior:url(fix.htc)}",
        )
        .unwrap();
        assert_eq!(sheet.charset(), Some("utf-8"));
        assert_eq!(sheet.imports().len(), 1);
        assert_eq!(sheet.imports()[0].href, "reset.css");
        assert_eq!(sheet.imports()[0].media, "screen");

        let urls: Vec<_> = sheet
            .urls()
            .iter()
            .map(|u| (u.property.as_deref(), u.href.as_str()))
            .collect();
        assert_eq!(
            urls,
            [
                (Some("background-image"), "bg.png"),
                (Some("behavior"), "fix.htc")
            ]
        );
    }

    #[test]
    fn test_urls_in_nested_blocks() {
        let sheet = Stylesheet::parse(
            "@font-face{font-family:f;src:url(f.woff)}\n@media print{.a{background-image:url(p.png)}}\n@supports (display:grid){.b{cursor:url(c.cur),auto}}",
        )
        .unwrap();
        assert_eq!(hrefs(&sheet), ["f.woff", "p.png", "c.cur"]);
        assert_eq!(sheet.urls()[0].property, None);
    }

    #[test]
    fn test_pretty_and_compact() {
        let sheet = Stylesheet::parse("a  b{color:red}").unwrap();
        assert_eq!(sheet.serialize(false), "a b{color:red}");
        assert_eq!(sheet.serialize(true), "a b {\n  color: red;\n}\n");

        let again = Stylesheet::parse(&sheet.serialize(true)).unwrap();
        assert_eq!(again.serialize(true), sheet.serialize(true));
    }

    #[test]
    fn test_serialized_urls_follow_quoting_rule() {
        let mut sheet = Stylesheet::parse(".a{background-image:url(\"a.png\")}").unwrap();
        assert_eq!(sheet.serialize(false), ".a{background-image:url(a.png)}");

        let id = sheet.urls()[0].id();
        assert!(sheet.set_url_href(id, "foo bar.png"));
        assert_eq!(sheet.url(id).unwrap().href, "foo bar.png");
        assert_eq!(sheet.serialize(false), ".a{background-image:url('foo bar.png')}");
    }

    #[test]
    fn test_url_token_quoting() {
        assert_eq!(url_token("foo.png"), "url(foo.png)");
        assert_eq!(url_token("foo bar.png"), "url('foo bar.png')");
        assert_eq!(url_token("a'b\"c"), r#"url('a\'b\"c')"#);
        assert_eq!(url_token("http://x/y.png"), "url('http://x/y.png')");
    }

    #[test]
    fn test_url_tokens_in_value() {
        let tokens = url_tokens(r#"url( "a b.png" ), url(c.png) , myurl(d), "url(e)""#);
        let urls: Vec<_> = tokens.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, ["a b.png", "c.png"]);
        assert_eq!(url_tokens(r"url('it\'s.png')")[0].url, "it's.png");
    }

    #[test]
    fn test_remove_url_item() {
        let text = r#"background: url("a.png") no-repeat, url("b.png")"#;
        assert_eq!(
            remove_url_item(text, 0).as_deref(),
            Some(r#"background: url("b.png")"#)
        );
        assert_eq!(
            remove_url_item(text, 1).as_deref(),
            Some(r#"background: url("a.png") no-repeat"#)
        );
        assert_eq!(remove_url_item(r#"cursor: url("a.cur"), auto"#, 0), None);
    }

    #[test]
    fn test_remove_one_of_two_urls_keeps_the_other() {
        let mut sheet = Stylesheet::parse(".a { background: url(a.png), url(b.png) }").unwrap();
        let [a, b] = [sheet.urls()[0].id(), sheet.urls()[1].id()];

        assert!(sheet.remove_url(a));
        assert!(sheet.url(a).is_none());
        assert_eq!(sheet.url(b).unwrap().href, "b.png");
        assert!(sheet.serialize(false).contains("url(b.png)"));
        assert!(!sheet.serialize(false).contains("a.png"));

        assert!(sheet.set_url_href(b, "c.png"));
        assert!(sheet.serialize(false).contains("url(c.png)"));

        assert!(sheet.remove_url(b));
        assert!(sheet.urls().is_empty());
        assert!(!sheet.serialize(false).contains("url("));
    }

    #[test]
    fn test_remove_font_source() {
        let mut sheet =
            Stylesheet::parse("@font-face{font-family:f;src:url(f.woff2) format(\"woff2\"),url(f.woff)}")
                .unwrap();
        let first = sheet.urls()[0].id();
        assert!(sheet.remove_url(first));
        assert_eq!(hrefs(&sheet), ["f.woff"]);
        let out = sheet.serialize(false);
        assert!(out.contains("url(f.woff)") && !out.contains("woff2"));
    }

    #[test]
    fn test_imports_insert_and_remove() {
        let mut sheet = Stylesheet::parse("@charset \"utf-8\";a{b:c}").unwrap();
        let id = sheet.insert_import(0, "x.css", "print").unwrap();
        assert_eq!(sheet.serialize(false), "@charset \"utf-8\";@import url(x.css) print;a{b:c}");

        let last = sheet.insert_import(1, "y.css", "").unwrap();
        assert_eq!(sheet.import_index(last), Some(1));
        assert!(sheet.set_import_href(id, "z z.css"));
        assert_eq!(
            sheet.serialize(false),
            "@charset \"utf-8\";@import url('z z.css') print;@import url(y.css);a{b:c}"
        );

        assert!(sheet.remove_import(id));
        assert_eq!(sheet.imports().len(), 1);
        assert_eq!(sheet.serialize(false), "@charset \"utf-8\";@import url(y.css);a{b:c}");
    }

    #[test]
    fn test_parse_errors_have_position() {
        let err = Stylesheet::parse(".a { color: red }\n!!! { color: red }").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.column.is_some());
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_sniff_charset() {
        assert_eq!(sniff_charset(b"@charset \"ISO-8859-1\";").as_deref(), Some("iso-8859-1"));
        assert_eq!(sniff_charset(b"body{}"), None);
    }
}
