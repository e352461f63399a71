//! Assets: the nodes of the graph.
//!
//! An asset holds up to three representations of its content: raw bytes,
//! decoded text and a structured parse tree. Exactly one of text / tree is
//! authoritative at a time; the other is derived on demand and cached.
//!
//! | Operation           | Effect                                              |
//! |---------------------|-----------------------------------------------------|
//! | `text()`            | cached text, else serialise tree, else decode bytes |
//! | `set_text()`        | drop tree/bytes/relations, store text, mark dirty   |
//! | `parse_tree()`      | cached tree, else parse text                        |
//! | `set_parse_tree()`  | drop text/bytes/relations, store tree, mark dirty   |
//! | `mark_dirty()`      | drop text/bytes when a tree exists                  |

mod config;
mod kind;
mod tree;


use std::fmt;

pub use config::{AssetConfig, Content};
pub use kind::AssetType;
pub use tree::ParseTree;

use crate::core::{AssetId, EventSink, GraphEvent, GraphId, RelationId};
use crate::error::{GraphError, Result};
use crate::relation::href::{self, FoundTarget, Placement};
use crate::relation::{Position, Relation};
use crate::syntax::Encoding;

/// Graph membership. Decides whether recoverable errors are reported on the
/// graph's event channel or returned to the caller.
#[derive(Debug, Clone, Default)]
pub(crate) enum Membership {
    #[default]
    Detached,
    Attached {
        graph: GraphId,
        events: EventSink,
    },
    /// Removed from a graph; can never join another.
    Removed {
        graph: GraphId,
    },
}

/// A node of the graph.
#[derive(Debug)]
pub struct Asset {
    id: AssetId,
    asset_type: AssetType,
    url: Option<String>,
    encoding: Encoding,
    encoding_explicit: bool,
    raw_bytes: Option<Vec<u8>>,
    text: Option<String>,
    parse_tree: Option<ParseTree>,
    is_dirty: bool,
    /// Inline asset changed since its text was last copied into the
    /// element holding it.
    inline_changed: bool,
    pretty: bool,
    /// `None` until discovered from the structured form.
    relations: Option<Vec<Relation>>,
    is_initial: bool,
    keep_unloaded: bool,
    pub(crate) membership: Membership,
}

// =============================================================================
// Construction & accessors
// =============================================================================

impl Asset {
    /// Create an unloaded, unattached asset.
    pub fn new(asset_type: AssetType, url: Option<&str>) -> Self {
        Self {
            id: AssetId::next(),
            asset_type,
            url: url.map(str::to_owned),
            encoding: Encoding::default(),
            encoding_explicit: false,
            raw_bytes: None,
            text: None,
            parse_tree: None,
            is_dirty: false,
            inline_changed: false,
            pretty: false,
            relations: None,
            is_initial: false,
            keep_unloaded: false,
            membership: Membership::Detached,
        }
    }

    /// Create an asset from a configuration. Content given in the config is
    /// taken as loaded, not dirty.
    pub fn from_config(config: AssetConfig) -> Result<Self> {
        let asset_type = config.resolved_type();
        let mut asset = Self::new(asset_type, config.url.as_deref());
        asset.is_initial = config.is_initial;
        asset.keep_unloaded = config.keep_unloaded;
        if let Some(encoding) = config.encoding {
            asset.encoding = encoding;
            asset.encoding_explicit = true;
        }
        match config.content {
            Some(Content::RawBytes(bytes)) => asset.load_bytes(bytes),
            Some(Content::Text(text)) => {
                asset.check_text()?;
                asset.text = Some(text);
            }
            Some(Content::ParseTree(tree)) => {
                if !tree.fits(asset_type) {
                    return Err(GraphError::Unsupported {
                        asset_type: asset_type.name(),
                        operation: "this parse tree",
                    });
                }
                asset.parse_tree = Some(tree);
            }
            None => {}
        }
        Ok(asset)
    }

    #[inline]
    pub fn id(&self) -> AssetId {
        self.id
    }

    #[inline]
    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    #[inline]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Change the asset's url. Only its identity for resolution changes;
    /// use `AssetGraph::set_asset_url` to also rewrite hrefs pointing at it.
    pub fn set_url(&mut self, url: Option<&str>) {
        self.url = url.map(str::to_owned);
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        self.url.is_none()
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    #[inline]
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    #[inline]
    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    pub fn set_initial(&mut self, is_initial: bool) {
        self.is_initial = is_initial;
    }

    #[inline]
    pub fn keep_unloaded(&self) -> bool {
        self.keep_unloaded
    }

    /// Whether any representation of the content is present.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.raw_bytes.is_some() || self.text.is_some() || self.parse_tree.is_some()
    }

    /// Graph the asset belongs (or belonged) to.
    pub fn graph(&self) -> Option<GraphId> {
        match &self.membership {
            Membership::Detached => None,
            Membership::Attached { graph, .. } | Membership::Removed { graph } => Some(*graph),
        }
    }

    /// Report `err` on the graph channel when attached, otherwise return it.
    fn recover(&self, err: GraphError) -> Result<()> {
        match &self.membership {
            Membership::Attached { events, .. } => {
                events.emit(GraphEvent::from_error(&err).with_asset(self.id));
                Ok(())
            }
            _ => Err(err),
        }
    }

    fn unsupported(&self, operation: &'static str) -> GraphError {
        GraphError::Unsupported {
            asset_type: self.asset_type.name(),
            operation,
        }
    }

    fn check_text(&self) -> Result<()> {
        if self.asset_type.is_text() {
            Ok(())
        } else {
            Err(self.unsupported("text"))
        }
    }
}

// =============================================================================
// Representations
// =============================================================================

impl Asset {
    /// Decoded text, derived and cached on first access.
    pub fn text(&mut self) -> Result<&str> {
        if self.text.is_none() {
            let text = self.derive_text()?;
            self.text = Some(text);
        }
        Ok(self.text.as_deref().unwrap_or_default())
    }

    fn derive_text(&self) -> Result<String> {
        self.check_text()?;
        if let Some(tree) = &self.parse_tree {
            return Ok(tree.serialize(self.pretty));
        }
        match &self.raw_bytes {
            Some(bytes) => Ok(self.encoding.decode(bytes)),
            None => Err(GraphError::NotLoaded(self.to_string())),
        }
    }

    /// Replace the content with `text`.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.check_text()?;
        self.unload();
        self.text = Some(text.into());
        self.mark_dirty();
        Ok(())
    }

    /// Serialised bytes, encoded from the text on demand.
    pub fn raw_bytes(&mut self) -> Result<&[u8]> {
        if self.raw_bytes.is_none() {
            let encoding = self.encoding;
            let bytes = encoding.encode(self.text()?).into_owned();
            self.raw_bytes = Some(bytes);
        }
        Ok(self.raw_bytes.as_deref().unwrap_or_default())
    }

    /// Replace the content with `bytes`.
    pub fn set_raw_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.unload();
        self.raw_bytes = Some(bytes.into());
        self.mark_dirty();
    }

    /// Store freshly fetched bytes: not dirty, encoding sniffed unless set.
    pub(crate) fn load_bytes(&mut self, bytes: Vec<u8>) {
        if !self.encoding_explicit
            && let Some(label) = self.asset_type.sniff_encoding(&bytes)
            && let Ok(encoding) = Encoding::from_label(&label)
        {
            self.encoding = encoding;
        }
        self.unload();
        self.raw_bytes = Some(bytes);
    }

    fn unload(&mut self) {
        self.raw_bytes = None;
        self.text = None;
        self.parse_tree = None;
        self.relations = None;
    }

    /// Structured form, parsed on first access.
    ///
    /// A parse failure on an attached asset is reported on the graph's error
    /// channel and yields `None`; on an unattached asset it is returned.
    pub fn parse_tree(&mut self) -> Result<Option<&ParseTree>> {
        self.ensure_tree()?;
        Ok(self.parse_tree.as_ref())
    }

    /// Mutable structured form. Call [`Asset::mark_dirty`] after changing it.
    pub fn parse_tree_mut(&mut self) -> Result<Option<&mut ParseTree>> {
        self.ensure_tree()?;
        Ok(self.parse_tree.as_mut())
    }

    /// Replace the content with `tree`.
    pub fn set_parse_tree(&mut self, tree: ParseTree) -> Result<()> {
        if !tree.fits(self.asset_type) {
            return Err(self.unsupported("this parse tree"));
        }
        self.unload();
        self.parse_tree = Some(tree);
        self.mark_dirty();
        Ok(())
    }

    /// Make sure a tree is present. `Ok(false)` means a parse error was
    /// reported on the graph channel.
    fn ensure_tree(&mut self) -> Result<bool> {
        if self.parse_tree.is_some() {
            return Ok(true);
        }
        if !self.asset_type.has_parse_tree() {
            return Err(self.unsupported("parse tree"));
        }
        let asset_type = self.asset_type;
        match ParseTree::parse(asset_type, self.text()?) {
            Ok(tree) => {
                self.parse_tree = tree;
                Ok(self.parse_tree.is_some())
            }
            Err(failure) => {
                let err = GraphError::Parse(failure.with_url(self.url.as_deref()));
                self.recover(err).map(|()| false)
            }
        }
    }

    /// The structured form changed: cached serialisations are stale.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
        self.inline_changed = self.url.is_none();
        if self.parse_tree.is_some() {
            self.text = None;
            self.raw_bytes = None;
        }
    }

    /// Serialise multi-line and indented from now on.
    pub fn pretty_print(&mut self) -> Result<()> {
        self.set_pretty(true, "pretty_print")
    }

    /// Serialise compactly from now on.
    pub fn minify(&mut self) -> Result<()> {
        self.set_pretty(false, "minify")
    }

    fn set_pretty(&mut self, pretty: bool, operation: &'static str) -> Result<()> {
        if !self.asset_type.is_pretty_printable() {
            return Err(self.unsupported(operation));
        }
        if !self.ensure_tree()? {
            return Ok(());
        }
        self.pretty = pretty;
        self.mark_dirty();
        Ok(())
    }

    /// Re-encode the asset. Html and Css also get their charset declaration
    /// rewritten.
    pub fn set_encoding(&mut self, encoding: Encoding) -> Result<()> {
        self.check_text()?;
        if encoding == self.encoding {
            self.encoding_explicit = true;
            return Ok(());
        }
        if self.is_loaded() {
            // Decode with the old encoding before switching.
            self.text()?;
            let declares_charset = self.asset_type.is_html_like() || self.asset_type == AssetType::Css;
            if declares_charset && self.ensure_tree()? {
                match self.parse_tree.as_mut() {
                    Some(ParseTree::Html(doc)) => doc.set_charset(encoding.label()),
                    Some(ParseTree::Css(sheet)) => {
                        sheet.set_charset(encoding.label());
                    }
                    _ => {}
                }
            }
        }
        self.encoding = encoding;
        self.encoding_explicit = true;
        self.raw_bytes = None;
        self.mark_dirty();
        Ok(())
    }
}

// =============================================================================
// Relations
// =============================================================================

impl Asset {
    /// Discover relations from the structured form, once.
    ///
    /// Unloaded assets have no relations and are retried on the next call.
    pub(crate) fn ensure_relations(&mut self) -> Result<()> {
        if self.relations.is_some() || !self.is_loaded() {
            return Ok(());
        }
        if !self.asset_type.has_parse_tree() {
            self.relations = Some(Vec::new());
            return Ok(());
        }
        let found = if self.ensure_tree()? {
            self.parse_tree.as_ref().map(href::discover).unwrap_or_default()
        } else {
            Vec::new()
        };
        let from = self.id;
        let relations = found
            .into_iter()
            .map(|f| {
                let target = match f.target {
                    FoundTarget::Href(href) => AssetConfig {
                        asset_type: f.relation_type.target_type_hint(),
                        url: Some(href),
                        ..AssetConfig::default()
                    },
                    FoundTarget::Inline(asset_type, text) => AssetConfig {
                        asset_type: Some(asset_type),
                        content: Some(Content::Text(text)),
                        ..AssetConfig::default()
                    },
                };
                Relation::discovered(f.relation_type, f.binding, from, target)
            })
            .collect();
        self.relations = Some(relations);
        Ok(())
    }

    /// Outgoing relations in order, discovering them if needed.
    pub fn outgoing_relations(&mut self) -> Result<&[Relation]> {
        self.ensure_relations()?;
        Ok(self.relations.as_deref().unwrap_or_default())
    }

    /// Outgoing relations discovered so far.
    #[inline]
    pub fn relations(&self) -> &[Relation] {
        self.relations.as_deref().unwrap_or_default()
    }

    pub(crate) fn relations_mut(&mut self) -> &mut [Relation] {
        self.relations.as_deref_mut().unwrap_or_default()
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations().iter().find(|r| r.id() == id)
    }

    pub(crate) fn relation_mut(&mut self, id: RelationId) -> Option<&mut Relation> {
        self.relations_mut().iter_mut().find(|r| r.id() == id)
    }

    fn relation_index(&self, id: RelationId) -> Option<usize> {
        self.relations().iter().position(|r| r.id() == id)
    }

    /// Validate an attach without mutating anything.
    pub(crate) fn check_attach(&mut self, relation: &Relation, position: Position) -> Result<()> {
        let relation_type = relation.relation_type();
        if relation.is_attached() {
            return Err(GraphError::Attach(format!(
                "{relation} is already attached"
            )));
        }
        if !relation_type.can_originate_from(self.asset_type) {
            return Err(GraphError::Attach(format!(
                "{relation_type} relations cannot originate from {self}"
            )));
        }
        self.ensure_relations()?;
        if let Some(adj) = position.adjacent() {
            let Some(adjacent) = self.relation(adj) else {
                return Err(GraphError::Attach(format!(
                    "adjacent relation {adj} is not in the outgoing relations of {self}"
                )));
            };
            if adjacent.relation_type() != relation_type {
                return Err(GraphError::Attach(format!(
                    "adjacent relation {adj} is a {}, expected {relation_type}",
                    adjacent.relation_type()
                )));
            }
        }
        if relation.binding.is_none() {
            if !self.ensure_tree()? {
                return Err(GraphError::Attach(format!(
                    "{self} has no structured form to attach to"
                )));
            }
            if let Some(tree) = &self.parse_tree {
                href::check_bindable(tree, relation_type)?;
            }
        }
        Ok(())
    }

    /// Insert `relation` at `position` in the outgoing relation list.
    ///
    /// A relation without a node in the structured form gets one created at
    /// the corresponding place. The asset is marked dirty.
    pub fn attach(&mut self, mut relation: Relation, position: Position) -> Result<RelationId> {
        self.check_attach(&relation, position)?;
        relation.prepare_content()?;

        let index = match position {
            Position::First => 0,
            Position::Last => self.relations().len(),
            Position::Before(adj) | Position::After(adj) => {
                let idx = self.relation_index(adj).unwrap_or_default();
                if matches!(position, Position::After(_)) { idx + 1 } else { idx }
            }
        };

        if relation.binding.is_none() {
            let placement = match position {
                Position::First => Placement::First,
                Position::Last => Placement::Last,
                Position::Before(adj) => Placement::Before(self.binding_of(adj)?),
                Position::After(adj) => Placement::After(self.binding_of(adj)?),
            };
            let href = relation.pending_href.take().unwrap_or_default();
            let media = relation.pending_media.take();
            let content = relation.pending_content.take();
            let Some(tree) = self.parse_tree.as_mut() else {
                return Err(GraphError::Attach("source asset is not parsed".into()));
            };
            let binding = href::bind(
                tree,
                relation.relation_type(),
                &href,
                media.as_deref(),
                content.as_deref(),
                placement,
            )?;
            relation.binding = Some(binding);
        }

        relation.from = Some(self.id);
        let id = relation.id();
        self.relations.get_or_insert_with(Vec::new).insert(index, relation);
        self.mark_dirty();
        Ok(id)
    }

    fn binding_of(&self, id: RelationId) -> Result<crate::relation::Binding> {
        self.relation(id)
            .and_then(|r| r.binding)
            .ok_or_else(|| GraphError::Attach(format!("adjacent relation {id} has no node")))
    }

    /// Remove relation `id` and its node. The asset is marked dirty.
    pub fn detach(&mut self, id: RelationId) -> Result<Relation> {
        let Some(index) = self.relation_index(id) else {
            return Err(GraphError::Detach(format!(
                "relation {id} is not in the outgoing relations of {self}"
            )));
        };
        let mut relation = match self.relations.as_mut() {
            Some(relations) => relations.remove(index),
            None => return Err(GraphError::Detach(format!("{self} has no relations"))),
        };
        if let (Some(binding), Some(tree)) = (relation.binding.take(), self.parse_tree.as_mut()) {
            href::unbind(tree, binding);
        }
        relation.from = None;
        self.mark_dirty();
        Ok(relation)
    }

    /// Current href of relation `id`.
    pub fn href(&self, id: RelationId) -> Result<Option<String>> {
        let relation = self
            .relation(id)
            .ok_or_else(|| GraphError::NotFound(format!("relation {id} in {self}")))?;
        Ok(match (relation.binding, &self.parse_tree) {
            (Some(binding), Some(tree)) => href::read(tree, relation.relation_type(), binding),
            _ => relation.pending_href.clone(),
        })
    }

    /// Write the href of relation `id` into the structured form.
    ///
    /// A relation that is not attached yet keeps the href for when it is.
    pub fn set_href(&mut self, id: RelationId, href: &str) -> Result<()> {
        let relation = self
            .relation(id)
            .ok_or_else(|| GraphError::NotFound(format!("relation {id} in {self}")))?;
        let (relation_type, binding) = (relation.relation_type(), relation.binding);

        let Some(binding) = binding else {
            if let Some(relation) = self.relation_mut(id) {
                relation.pending_href = Some(href.to_owned());
            }
            return Ok(());
        };
        if !self.ensure_tree()? {
            return Err(GraphError::NotFound(format!(
                "structured form of {self} to write relation {id} into"
            )));
        }
        let Some(tree) = self.parse_tree.as_mut() else {
            return Err(GraphError::NotFound(format!("node of relation {id}")));
        };
        if !href::write(tree, relation_type, binding, href) {
            return Err(GraphError::NotFound(format!("node of relation {id}")));
        }
        self.mark_dirty();
        Ok(())
    }

    /// Copy `text` into the element holding inline relation `id`.
    pub(crate) fn set_inline_content(&mut self, id: RelationId, text: &str) -> Result<()> {
        let binding = self
            .relation(id)
            .and_then(|r| r.binding)
            .ok_or_else(|| GraphError::NotFound(format!("node of relation {id}")))?;
        if !self.ensure_tree()? {
            return Ok(());
        }
        let written = self
            .parse_tree
            .as_mut()
            .is_some_and(|tree| href::write_content(tree, binding, text));
        if written {
            self.mark_dirty();
        }
        Ok(())
    }

    /// Text of an inline asset changed since the last call, if any.
    pub(crate) fn take_inline_change(&mut self) -> Result<Option<String>> {
        if !std::mem::take(&mut self.inline_changed) {
            return Ok(None);
        }
        Ok(Some(self.text()?.to_owned()))
    }

    #[inline]
    pub(crate) fn has_inline_change(&self) -> bool {
        self.inline_changed
    }

    /// Media query on the node of relation `id`.
    pub fn relation_media(&self, id: RelationId) -> Option<String> {
        let relation = self.relation(id)?;
        match (relation.binding, &self.parse_tree) {
            (Some(binding), Some(tree)) => href::media(tree, binding),
            _ => relation.pending_media.clone(),
        }
    }

    /// Detach every pending target asset from the relations, replacing it
    /// with a reference to its id.
    pub(crate) fn take_pending_targets(&mut self) -> Vec<Asset> {
        self.relations_mut()
            .iter_mut()
            .filter_map(Relation::take_pending)
            .collect()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}", self.asset_type, self.id)?;
        if let Some(url) = &self.url {
            write!(f, " {url}")?;
        }
        f.write_str("]")
    }
}
