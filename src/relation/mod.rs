//! Relations: typed, ordered edges between assets.
//!
//! A relation is owned by its source asset and lives in that asset's
//! outgoing relation list. Its href is not stored; reading and writing it
//! goes through a [`Binding`] into the source asset's structured form.

pub(crate) mod href;
mod kind;

use std::fmt;

pub use kind::{BaseAssetQuery, RelationType, SourceFamily};

use crate::asset::{Asset, AssetConfig};
use crate::core::{AssetId, RelationId};
use crate::error::{GraphError, Result};
use crate::syntax::css::{ImportId, UrlId};
use crate::syntax::html::NodeId;

/// Target of a relation.
#[derive(Debug)]
pub enum Target {
    /// A registered asset.
    Asset(AssetId),
    /// A new asset to be registered when the relation is attached through
    /// the graph.
    Pending(Box<Asset>),
    /// Placeholder until population resolves it.
    Unresolved(AssetConfig),
}

impl Target {
    #[inline]
    pub fn asset_id(&self) -> Option<AssetId> {
        match self {
            Self::Asset(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Asset(_))
    }
}

impl From<AssetId> for Target {
    fn from(id: AssetId) -> Self {
        Self::Asset(id)
    }
}

impl From<Asset> for Target {
    fn from(asset: Asset) -> Self {
        Self::Pending(Box::new(asset))
    }
}

impl From<AssetConfig> for Target {
    fn from(config: AssetConfig) -> Self {
        Self::Unresolved(config)
    }
}

/// Where a relation's href lives inside the source asset's structured form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Element carrying the href in an attribute.
    Element(NodeId),
    /// `<style>` / `<script>` holding the target's text.
    Inline(NodeId),
    Import(ImportId),
    Url(UrlId),
}

/// Insertion point within an asset's outgoing relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    First,
    Last,
    Before(RelationId),
    After(RelationId),
}

impl Position {
    /// Parse a textual position (`first`, `last`, `before`, `after`).
    pub fn parse(name: &str, adjacent: Option<RelationId>) -> Result<Self> {
        match (name, adjacent) {
            ("first", _) => Ok(Self::First),
            ("last", _) => Ok(Self::Last),
            ("before", Some(adj)) => Ok(Self::Before(adj)),
            ("after", Some(adj)) => Ok(Self::After(adj)),
            ("before" | "after", None) => Err(GraphError::Attach(format!(
                "position `{name}` requires an adjacent relation"
            ))),
            _ => Err(GraphError::Attach(format!("unknown position `{name}`"))),
        }
    }

    #[inline]
    pub fn adjacent(self) -> Option<RelationId> {
        match self {
            Self::Before(adj) | Self::After(adj) => Some(adj),
            _ => None,
        }
    }
}

/// A typed edge from one asset to another.
#[derive(Debug)]
pub struct Relation {
    id: RelationId,
    relation_type: RelationType,
    pub(crate) from: Option<AssetId>,
    pub(crate) to: Target,
    pub(crate) binding: Option<Binding>,
    /// Href requested before the relation had a binding.
    pub(crate) pending_href: Option<String>,
    pub(crate) pending_media: Option<String>,
    /// Text written into the element of a relation to an inline asset.
    pub(crate) pending_content: Option<String>,
}

impl Relation {
    pub fn new(relation_type: RelationType, to: impl Into<Target>) -> Self {
        Self {
            id: RelationId::next(),
            relation_type,
            from: None,
            to: to.into(),
            binding: None,
            pending_href: None,
            pending_media: None,
            pending_content: None,
        }
    }

    /// Explicit href to write when the relation is attached.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.pending_href = Some(href.into());
        self
    }

    /// Media query (`HtmlStyle` / `CssImport`).
    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.pending_media = Some(media.into());
        self
    }

    pub(crate) fn discovered(
        relation_type: RelationType,
        binding: Binding,
        from: AssetId,
        to: AssetConfig,
    ) -> Self {
        Self {
            from: Some(from),
            binding: Some(binding),
            ..Self::new(relation_type, to)
        }
    }

    #[inline]
    pub fn id(&self) -> RelationId {
        self.id
    }

    #[inline]
    pub fn relation_type(&self) -> RelationType {
        self.relation_type
    }

    /// Source asset, once attached.
    #[inline]
    pub fn from(&self) -> Option<AssetId> {
        self.from
    }

    #[inline]
    pub fn to(&self) -> &Target {
        &self.to
    }

    /// Target asset id when populated.
    #[inline]
    pub fn target(&self) -> Option<AssetId> {
        self.to.asset_id()
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.from.is_some()
    }

    /// Read the text of an inline pending target, which becomes the content
    /// of the node created on attach.
    pub(crate) fn prepare_content(&mut self) -> Result<()> {
        if self.binding.is_some() || self.pending_content.is_some() {
            return Ok(());
        }
        if let Target::Pending(asset) = &mut self.to
            && asset.is_inline()
        {
            self.pending_content = Some(asset.text()?.to_owned());
        }
        Ok(())
    }

    /// Take a pending target asset out, leaving a resolved reference.
    pub(crate) fn take_pending(&mut self) -> Option<Asset> {
        if !matches!(self.to, Target::Pending(_)) {
            return None;
        }
        let Target::Pending(asset) = std::mem::replace(&mut self.to, Target::Unresolved(AssetConfig::new()))
        else {
            return None;
        };
        self.to = Target::Asset(asset.id());
        Some(*asset)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}", self.relation_type, self.id)?;
        if let Some(from) = self.from {
            write!(f, ": {from} => ")?;
            match &self.to {
                Target::Asset(id) => write!(f, "{id}")?,
                Target::Pending(asset) => write!(f, "{asset}")?,
                Target::Unresolved(config) => {
                    write!(f, "{}", config.url.as_deref().unwrap_or("(inline)"))?
                }
            }
        }
        f.write_str("]")
    }
}
