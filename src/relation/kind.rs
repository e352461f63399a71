//! Relation type definitions.

use std::fmt;
use std::str::FromStr;

use crate::asset::AssetType;
use crate::error::GraphError;

/// Closed set of relation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationType {
    /// `<a href>`
    HtmlAnchor,
    /// `<img src>`
    HtmlImage,
    /// `<script src>`
    HtmlScript,
    /// `<link rel=stylesheet href>`
    HtmlStyle,
    /// `@import`
    CssImport,
    /// `url()` in any declaration but `behavior`
    CssImage,
    /// `url()` in a `behavior` declaration
    CssBehavior,
}

/// Structured form a relation type lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    Html,
    Css,
}

/// Which ancestor supplies the base url for a relation's href.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseAssetQuery {
    /// Nearest asset with a url.
    NonInline,
    /// Nearest Html-like asset with a url.
    HtmlWithUrl,
}

impl RelationType {
    pub const ALL: [Self; 7] = [
        Self::HtmlAnchor,
        Self::HtmlImage,
        Self::HtmlScript,
        Self::HtmlStyle,
        Self::CssImport,
        Self::CssImage,
        Self::CssBehavior,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::HtmlAnchor => "HtmlAnchor",
            Self::HtmlImage => "HtmlImage",
            Self::HtmlScript => "HtmlScript",
            Self::HtmlStyle => "HtmlStyle",
            Self::CssImport => "CssImport",
            Self::CssImage => "CssImage",
            Self::CssBehavior => "CssBehavior",
        }
    }

    pub const fn source_family(self) -> SourceFamily {
        match self {
            Self::HtmlAnchor | Self::HtmlImage | Self::HtmlScript | Self::HtmlStyle => {
                SourceFamily::Html
            }
            Self::CssImport | Self::CssImage | Self::CssBehavior => SourceFamily::Css,
        }
    }

    /// Whether assets of `asset_type` can hold this relation.
    pub fn can_originate_from(self, asset_type: AssetType) -> bool {
        match self.source_family() {
            SourceFamily::Html => asset_type.is_html_like(),
            SourceFamily::Css => asset_type == AssetType::Css,
        }
    }

    /// Element and attribute carrying the href of Html relations.
    pub const fn element_attr(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::HtmlAnchor => Some(("a", "href")),
            Self::HtmlImage => Some(("img", "src")),
            Self::HtmlScript => Some(("script", "src")),
            Self::HtmlStyle => Some(("link", "href")),
            _ => None,
        }
    }

    /// Type a newly discovered target is created with; `None` infers from
    /// the url.
    pub const fn target_type_hint(self) -> Option<AssetType> {
        match self {
            Self::HtmlScript => Some(AssetType::JavaScript),
            Self::HtmlStyle | Self::CssImport => Some(AssetType::Css),
            Self::CssBehavior => Some(AssetType::Htc),
            Self::HtmlAnchor | Self::HtmlImage | Self::CssImage => None,
        }
    }

    pub const fn base_asset_query(self) -> BaseAssetQuery {
        match self {
            Self::CssBehavior => BaseAssetQuery::HtmlWithUrl,
            _ => BaseAssetQuery::NonInline,
        }
    }
}

impl BaseAssetQuery {
    pub fn accepts(self, asset_type: AssetType, url: Option<&str>) -> bool {
        match self {
            Self::NonInline => url.is_some(),
            Self::HtmlWithUrl => url.is_some() && asset_type.is_html_like(),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelationType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GraphError::NotFound(format!("relation type `{s}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_asset_query() {
        let css = RelationType::CssImage.base_asset_query();
        assert!(css.accepts(AssetType::Css, Some("file:///a.css")));
        assert!(!css.accepts(AssetType::Css, None));

        let behavior = RelationType::CssBehavior.base_asset_query();
        assert!(!behavior.accepts(AssetType::Css, Some("file:///a.css")));
        assert!(behavior.accepts(AssetType::Html, Some("file:///a.html")));
    }

    #[test]
    fn test_families() {
        assert!(RelationType::HtmlStyle.can_originate_from(AssetType::Xhtml));
        assert!(!RelationType::HtmlStyle.can_originate_from(AssetType::Css));
        assert!(RelationType::CssImport.can_originate_from(AssetType::Css));
        assert_eq!("cssimport".parse::<RelationType>().unwrap(), RelationType::CssImport);
    }
}
