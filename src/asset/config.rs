//! Asset configuration: the description an asset is created from.

use super::{AssetType, ParseTree};
use crate::syntax::Encoding;

/// Initial content of an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    RawBytes(Vec<u8>),
    Text(String),
    ParseTree(ParseTree),
}

/// Everything needed to create (and possibly load) an asset.
///
/// Also used as the placeholder target of relations that have not been
/// populated yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetConfig {
    pub asset_type: Option<AssetType>,
    /// Absolute url, or `None` for an inline asset.
    pub url: Option<String>,
    pub content: Option<Content>,
    /// Explicit encoding; otherwise sniffed from the bytes or utf-8.
    pub encoding: Option<Encoding>,
    pub is_initial: bool,
    pub keep_unloaded: bool,
}

impl AssetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(Content::Text(text.into()));
        self
    }

    pub fn with_raw_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.content = Some(Content::RawBytes(bytes.into()));
        self
    }

    pub fn with_parse_tree(mut self, tree: ParseTree) -> Self {
        self.content = Some(Content::ParseTree(tree));
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn initial(mut self, is_initial: bool) -> Self {
        self.is_initial = is_initial;
        self
    }

    pub fn keep_unloaded(mut self, keep_unloaded: bool) -> Self {
        self.keep_unloaded = keep_unloaded;
        self
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        self.url.is_none()
    }

    /// Whether the config already carries content (no fetch needed).
    #[inline]
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Explicit type, else implied by a parse tree, else inferred from the
    /// url, else `Text`.
    pub fn resolved_type(&self) -> AssetType {
        if let Some(t) = self.asset_type {
            return t;
        }
        if let Some(Content::ParseTree(tree)) = &self.content {
            return tree.default_type();
        }
        self.url
            .as_deref()
            .map_or(AssetType::Text, AssetType::from_url)
    }
}

impl From<&str> for AssetConfig {
    fn from(url: &str) -> Self {
        Self::new().with_url(url)
    }
}

impl From<String> for AssetConfig {
    fn from(url: String) -> Self {
        Self::new().with_url(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_type() {
        assert_eq!(AssetConfig::from("file:///a.css").resolved_type(), AssetType::Css);
        assert_eq!(
            AssetConfig::from("file:///a.css")
                .with_type(AssetType::Text)
                .resolved_type(),
            AssetType::Text
        );
        let tree = ParseTree::Json(serde_json::json!({"a": 1}));
        assert_eq!(
            AssetConfig::new().with_parse_tree(tree).resolved_type(),
            AssetType::Json
        );
        assert_eq!(AssetConfig::new().resolved_type(), AssetType::Text);
        assert!(AssetConfig::new().is_inline());
    }
}
