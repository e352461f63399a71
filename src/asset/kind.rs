//! Asset type definitions.

use std::fmt;
use std::str::FromStr;

use crate::core::url::strip_query_fragment;
use crate::error::GraphError;
use crate::syntax::{css, html};

/// Closed set of asset types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetType {
    Html,
    Xhtml,
    /// HTML component (IE behaviour file).
    Htc,
    Css,
    JavaScript,
    Json,
    Text,
    Png,
    Gif,
    Jpeg,
    Ico,
}

impl AssetType {
    pub const ALL: [Self; 11] = [
        Self::Html,
        Self::Xhtml,
        Self::Htc,
        Self::Css,
        Self::JavaScript,
        Self::Json,
        Self::Text,
        Self::Png,
        Self::Gif,
        Self::Jpeg,
        Self::Ico,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Html => "Html",
            Self::Xhtml => "Xhtml",
            Self::Htc => "Htc",
            Self::Css => "Css",
            Self::JavaScript => "JavaScript",
            Self::Json => "Json",
            Self::Text => "Text",
            Self::Png => "Png",
            Self::Gif => "Gif",
            Self::Jpeg => "Jpeg",
            Self::Ico => "Ico",
        }
    }

    /// Infer the type from a url's file extension. Unknown extensions are `Text`.
    pub fn from_url(url: &str) -> Self {
        let path = strip_query_fragment(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        let ext = file
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        Self::from_extension(ext.as_deref())
    }

    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some("html" | "htm") => Self::Html,
            Some("xhtml") => Self::Xhtml,
            Some("htc") => Self::Htc,
            Some("css") => Self::Css,
            Some("js" | "mjs") => Self::JavaScript,
            Some("json") => Self::Json,
            Some("png") => Self::Png,
            Some("gif") => Self::Gif,
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("ico") => Self::Ico,
            _ => Self::Text,
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Xhtml => "application/xhtml+xml",
            Self::Htc => "text/x-component",
            Self::Css => "text/css",
            Self::JavaScript => "text/javascript",
            Self::Json => "application/json",
            Self::Text => "text/plain",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Jpeg => "image/jpeg",
            Self::Ico => "image/x-icon",
        }
    }

    pub const fn default_extension(self) -> &'static str {
        match self {
            Self::Html => ".html",
            Self::Xhtml => ".xhtml",
            Self::Htc => ".htc",
            Self::Css => ".css",
            Self::JavaScript => ".js",
            Self::Json => ".json",
            Self::Text => ".txt",
            Self::Png => ".png",
            Self::Gif => ".gif",
            Self::Jpeg => ".jpg",
            Self::Ico => ".ico",
        }
    }

    /// Whether the asset has a text representation.
    pub const fn is_text(self) -> bool {
        !matches!(self, Self::Png | Self::Gif | Self::Jpeg | Self::Ico)
    }

    /// Whether the asset has a structured form.
    pub const fn has_parse_tree(self) -> bool {
        matches!(
            self,
            Self::Html | Self::Xhtml | Self::Htc | Self::Css | Self::JavaScript | Self::Json
        )
    }

    /// Whether `pretty_print` / `minify` are available.
    pub const fn is_pretty_printable(self) -> bool {
        matches!(self, Self::Css | Self::JavaScript | Self::Json)
    }

    /// Html, Xhtml and Htc share the HTML structured form.
    pub const fn is_html_like(self) -> bool {
        matches!(self, Self::Html | Self::Xhtml | Self::Htc)
    }

    /// Charset declared inside raw bytes, if the format has a way to say so.
    pub fn sniff_encoding(self, bytes: &[u8]) -> Option<String> {
        match self {
            t if t.is_html_like() => html::sniff_charset(bytes),
            Self::Css => css::sniff_charset(bytes),
            _ => None,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AssetType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GraphError::NotFound(format!("asset type `{s}`")))
    }
}
