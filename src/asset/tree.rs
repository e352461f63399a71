//! Per-type structured forms.

use serde_json::Value;

use super::AssetType;
use crate::error::ParseFailure;
use crate::syntax::{self, HtmlDocument, JsSource, Stylesheet};

/// Structured form of an asset, selected by its type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    Html(HtmlDocument),
    Css(Stylesheet),
    Json(Value),
    JavaScript(JsSource),
}

impl ParseTree {
    /// Parse `text` as `asset_type`. Returns `Ok(None)` for types without a
    /// structured form.
    pub fn parse(asset_type: AssetType, text: &str) -> Result<Option<Self>, ParseFailure> {
        let tree = match asset_type {
            t if t.is_html_like() => Self::Html(HtmlDocument::parse(text)?),
            AssetType::Css => Self::Css(Stylesheet::parse(text)?),
            AssetType::Json => Self::Json(syntax::parse_json(text)?),
            AssetType::JavaScript => Self::JavaScript(JsSource::parse(text)?),
            _ => return Ok(None),
        };
        Ok(Some(tree))
    }

    pub fn serialize(&self, pretty: bool) -> String {
        match self {
            Self::Html(doc) => doc.serialize(),
            Self::Css(sheet) => sheet.serialize(pretty),
            Self::Json(value) => syntax::print_json(value, pretty),
            Self::JavaScript(js) => js.print(pretty),
        }
    }

    /// Whether this form can back an asset of `asset_type`.
    pub fn fits(&self, asset_type: AssetType) -> bool {
        match self {
            Self::Html(_) => asset_type.is_html_like(),
            Self::Css(_) => asset_type == AssetType::Css,
            Self::Json(_) => asset_type == AssetType::Json,
            Self::JavaScript(_) => asset_type == AssetType::JavaScript,
        }
    }

    /// Asset type implied by the variant.
    pub fn default_type(&self) -> AssetType {
        match self {
            Self::Html(_) => AssetType::Html,
            Self::Css(_) => AssetType::Css,
            Self::Json(_) => AssetType::Json,
            Self::JavaScript(_) => AssetType::JavaScript,
        }
    }

    pub fn as_html(&self) -> Option<&HtmlDocument> {
        match self {
            Self::Html(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_html_mut(&mut self) -> Option<&mut HtmlDocument> {
        match self {
            Self::Html(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_css(&self) -> Option<&Stylesheet> {
        match self {
            Self::Css(sheet) => Some(sheet),
            _ => None,
        }
    }

    pub fn as_css_mut(&mut self) -> Option<&mut Stylesheet> {
        match self {
            Self::Css(sheet) => Some(sheet),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_json_mut(&mut self) -> Option<&mut Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}
