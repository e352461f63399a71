//! The asset graph: registry, relation bookkeeping and queries.
//!
//! The graph owns every asset keyed by id and remembers registration order.
//! Relations are owned by their source asset; the graph's relation set is the
//! union of every asset's outgoing relations, walked in registration order.
//!
//! Errors raised while working on attached assets (parse failures, failed
//! loads, cycles) go to the graph's [`EventSink`]; structural misuse
//! (attach/detach/registration) is always returned.

mod populate;
pub mod query;
mod traverse;


use std::collections::VecDeque;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

pub use query::{AssetQuery, AssetSelector, Matcher, RelationQuery};
pub use traverse::Origin;

use crate::asset::{Asset, AssetConfig, Membership};
use crate::core::url::{build_relative_url, ensure_trailing_slash, fs_dir_to_file_url, has_scheme, resolve_url};
use crate::core::{AssetId, EventKind, EventSink, GraphEvent, GraphId, RelationId};
use crate::error::{GraphError, Result};
use crate::relation::{Position, Relation, RelationType, Target};

/// A mutable, typed, directed graph of interlinked assets.
#[derive(Debug)]
pub struct AssetGraph {
    id: GraphId,
    root: String,
    assets: FxHashMap<AssetId, Asset>,
    order: Vec<AssetId>,
    events: EventSink,
}

// =============================================================================
// Construction & access
// =============================================================================

impl AssetGraph {
    /// Create an empty graph rooted at `root` (a url; a trailing slash is
    /// added when missing).
    pub fn new(root: &str) -> Self {
        Self {
            id: GraphId::next(),
            root: ensure_trailing_slash(root),
            assets: FxHashMap::default(),
            order: Vec::new(),
            events: EventSink::new(),
        }
    }

    /// Create an empty graph rooted at a local directory.
    pub fn from_dir(dir: &Path) -> Self {
        Self::new(&fs_dir_to_file_url(dir))
    }

    #[inline]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Base url of the site, always with a trailing slash.
    #[inline]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[inline]
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Subscribe to recoverable errors.
    pub fn on_error<F>(&self, listener: F)
    where
        F: FnMut(&GraphEvent) + Send + 'static,
    {
        self.events.on(EventKind::Error, listener);
    }

    /// Subscribe to warnings.
    pub fn on_warn<F>(&self, listener: F)
    where
        F: FnMut(&GraphEvent) + Send + 'static,
    {
        self.events.on(EventKind::Warn, listener);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    /// Mutable access. Pending changes of inline assets are copied into the
    /// assets holding them first.
    pub fn asset_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.sync_inline();
        self.assets.get_mut(&id)
    }

    /// Asset ids in registration order.
    pub fn asset_ids(&self) -> &[AssetId] {
        &self.order
    }

    /// Assets in registration order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.order.iter().filter_map(|id| self.assets.get(id))
    }

    /// The registered asset with `url`.
    pub fn asset_by_url(&self, url: &str) -> Option<AssetId> {
        self.assets().find(|a| a.url() == Some(url)).map(Asset::id)
    }

    fn require(&self, id: AssetId) -> Result<&Asset> {
        self.assets
            .get(&id)
            .ok_or_else(|| GraphError::NotFound(format!("asset {id}")))
    }

    fn require_mut(&mut self, id: AssetId) -> Result<&mut Asset> {
        self.assets
            .get_mut(&id)
            .ok_or_else(|| GraphError::NotFound(format!("asset {id}")))
    }
}

// =============================================================================
// Registration
// =============================================================================

impl AssetGraph {
    /// Register `asset`.
    ///
    /// Fails with [`GraphError::AlreadyAttached`] if the asset belongs, or
    /// belonged, to a graph. Pending target assets of its relations are
    /// registered along with it.
    pub fn add_asset(&mut self, mut asset: Asset) -> Result<AssetId> {
        if !matches!(asset.membership, Membership::Detached) {
            return Err(GraphError::AlreadyAttached(asset.id()));
        }
        let id = asset.id();
        asset.membership = Membership::Attached {
            graph: self.id,
            events: self.events.clone(),
        };
        let pending = asset.take_pending_targets();
        let url = asset.url().map(str::to_owned);
        self.assets.insert(id, asset);
        self.order.push(id);

        for target in pending {
            if matches!(target.membership, Membership::Detached) {
                self.add_asset(target)?;
            }
        }
        if let Some(url) = url {
            self.link_placeholders(&url, id);
        }
        self.discover(id);
        Ok(id)
    }

    /// Unregister asset `id` and return it.
    ///
    /// Fails while other assets still have relations pointing at it.
    pub fn remove_asset(&mut self, id: AssetId) -> Result<Asset> {
        self.require(id)?;
        let incoming: Vec<_> = self
            .find_incoming(id)
            .into_iter()
            .filter(|rid| self.relation_owner(*rid) != Some(id))
            .collect();
        if let Some(first) = incoming.first() {
            return Err(GraphError::Detach(format!(
                "cannot remove {}: {} incoming relation(s) remain, e.g. {}",
                self.require(id)?,
                incoming.len(),
                self.describe_relation(*first).unwrap_or_default()
            )));
        }
        let mut asset = self
            .assets
            .remove(&id)
            .ok_or_else(|| GraphError::NotFound(format!("asset {id}")))?;
        self.order.retain(|a| *a != id);
        asset.membership = Membership::Removed { graph: self.id };
        Ok(asset)
    }

    /// Discover the relations of asset `id`, resolve their target urls and
    /// link them to registered assets. Failures are reported as events.
    pub(crate) fn discover(&mut self, id: AssetId) {
        let Some(asset) = self.assets.get_mut(&id) else {
            return;
        };
        if let Err(err) = asset.ensure_relations() {
            self.events.emit(GraphEvent::from_error(&err).with_asset(id));
            return;
        }

        let relative: Vec<(RelationId, RelationType)> = asset
            .relations()
            .iter()
            .filter_map(|r| match r.to() {
                Target::Unresolved(config) if config.url.as_deref().is_some_and(|u| !has_scheme(u)) => {
                    Some((r.id(), r.relation_type()))
                }
                _ => None,
            })
            .collect();
        for (rid, relation_type) in relative {
            let base = self.base_url(id, relation_type);
            if let Some(relation) = self.assets.get_mut(&id).and_then(|a| a.relation_mut(rid))
                && let Target::Unresolved(config) = &mut relation.to
                && let Some(url) = &config.url
            {
                config.url = Some(resolve_url(&base, url));
            }
        }

        self.register_inline(id);

        let unresolved: Vec<(RelationId, String)> = self.assets[&id]
            .relations()
            .iter()
            .filter_map(|r| match r.to() {
                Target::Unresolved(config) => config.url.clone().map(|u| (r.id(), u)),
                _ => None,
            })
            .collect();
        for (rid, url) in unresolved {
            if let Some(target) = self.asset_by_url(&url) {
                self.set_target(rid, target);
            }
        }
    }

    /// Turn the inline targets of asset `id` into registered assets. The
    /// relation points at the new asset before it is registered, so its own
    /// relations resolve against the right base.
    fn register_inline(&mut self, id: AssetId) {
        let mut created = Vec::new();
        let mut failed = Vec::new();
        if let Some(asset) = self.assets.get_mut(&id) {
            for relation in asset.relations_mut() {
                let is_inline = matches!(
                    relation.to(),
                    Target::Unresolved(config) if config.is_inline() && config.has_content()
                );
                if !is_inline {
                    continue;
                }
                let Target::Unresolved(config) =
                    std::mem::replace(&mut relation.to, Target::Unresolved(AssetConfig::new()))
                else {
                    continue;
                };
                match Asset::from_config(config) {
                    Ok(child) => {
                        relation.to = Target::Asset(child.id());
                        created.push(child);
                    }
                    Err(err) => failed.push(err),
                }
            }
        }
        for err in failed {
            self.events.emit(GraphEvent::from_error(&err).with_asset(id));
        }
        for child in created {
            if let Err(err) = self.add_asset(child) {
                self.events.emit(GraphEvent::from_error(&err).with_asset(id));
            }
        }
    }

    /// Copy the text of changed inline assets into the `<style>` / `<script>`
    /// elements holding them, repeating while that changes further inline
    /// assets.
    pub fn sync_inline(&mut self) {
        for _ in 0..=self.order.len() {
            let changed: Vec<AssetId> = self
                .assets()
                .filter(|a| a.has_inline_change())
                .map(Asset::id)
                .collect();
            if changed.is_empty() {
                return;
            }
            for id in changed {
                let text = match self.assets.get_mut(&id).map(Asset::take_inline_change) {
                    Some(Ok(Some(text))) => text,
                    Some(Err(err)) => {
                        self.events.emit(GraphEvent::from_error(&err).with_asset(id));
                        continue;
                    }
                    _ => continue,
                };
                for rid in self.find_incoming(id) {
                    let Some(owner) = self.relation_owner(rid) else {
                        continue;
                    };
                    let result = match self.assets.get_mut(&owner) {
                        Some(asset) => asset.set_inline_content(rid, &text),
                        None => continue,
                    };
                    if let Err(err) = result {
                        self.events.emit(GraphEvent::from_error(&err).with_asset(owner));
                    }
                }
            }
        }
    }

    /// Point every placeholder for `url` at asset `target`.
    fn link_placeholders(&mut self, url: &str, target: AssetId) {
        let matching: Vec<RelationId> = self
            .assets()
            .flat_map(Asset::relations)
            .filter(|r| matches!(r.to(), Target::Unresolved(c) if c.url.as_deref() == Some(url)))
            .map(Relation::id)
            .collect();
        for rid in matching {
            self.set_target(rid, target);
        }
    }

    pub(crate) fn set_target(&mut self, rid: RelationId, target: AssetId) {
        if let Some(owner) = self.relation_owner(rid)
            && let Some(relation) = self.assets.get_mut(&owner).and_then(|a| a.relation_mut(rid))
        {
            relation.to = Target::Asset(target);
        }
    }
}

// =============================================================================
// Relations
// =============================================================================

impl AssetGraph {
    /// Relations anywhere in the graph pointing at asset `id`, in graph order.
    pub fn find_incoming(&self, id: AssetId) -> Vec<RelationId> {
        self.assets()
            .flat_map(Asset::relations)
            .filter(|r| r.target() == Some(id))
            .map(Relation::id)
            .collect()
    }

    /// Relations of `id` in attachment order, discovering them if needed.
    pub fn find_outgoing(&mut self, id: AssetId) -> Vec<RelationId> {
        self.discover(id);
        self.assets
            .get(&id)
            .map(|a| a.relations().iter().map(Relation::id).collect())
            .unwrap_or_default()
    }

    pub fn relation(&self, rid: RelationId) -> Option<&Relation> {
        self.assets().find_map(|a| a.relation(rid))
    }

    /// Source asset of relation `rid`.
    pub fn relation_owner(&self, rid: RelationId) -> Option<AssetId> {
        self.assets().find(|a| a.relation(rid).is_some()).map(Asset::id)
    }

    /// Attach `relation` to asset `from` and register its target if it is a
    /// not-yet-registered asset.
    ///
    /// Atomic: when the attach would fail nothing is mutated. A relation
    /// without an explicit href gets one computed from the target's url.
    pub fn attach_and_add_relation(
        &mut self,
        from: AssetId,
        mut relation: Relation,
        position: Position,
    ) -> Result<RelationId> {
        if let Target::Pending(target) = relation.to()
            && !matches!(target.membership, Membership::Detached)
        {
            return Err(GraphError::AlreadyAttached(target.id()));
        }
        self.discover(from);
        self.require_mut(from)?.check_attach(&relation, position)?;

        relation.prepare_content()?;
        if relation.binding.is_none()
            && relation.pending_content.is_none()
            && let Some(target) = relation.target()
            && let Some(target) = self.assets.get_mut(&target)
            && target.is_inline()
        {
            relation.pending_content = Some(target.text()?.to_owned());
        }
        let asset = self.require_mut(from)?;

        let refresh = relation.binding.is_none() && relation.pending_href.is_none();
        let pending = relation.take_pending();
        let rid = asset.attach(relation, position)?;

        match pending {
            Some(target) => {
                self.add_asset(target)?;
            }
            None => self.discover(from),
        }
        if refresh {
            self.refresh_href(rid)?;
        }
        Ok(rid)
    }

    /// Detach relation `rid`. With `remove_orphan`, its target is removed as
    /// well when nothing else points at it and it is not an initial asset.
    pub fn detach_and_remove_relation(&mut self, rid: RelationId, remove_orphan: bool) -> Result<Relation> {
        let owner = self
            .relation_owner(rid)
            .ok_or_else(|| GraphError::Detach(format!("relation {rid} is not attached in this graph")))?;
        let relation = self.require_mut(owner)?.detach(rid)?;

        if remove_orphan
            && let Some(target) = relation.target()
            && self.asset(target).is_some_and(|a| !a.is_initial())
            && self.find_incoming(target).is_empty()
        {
            self.remove_asset(target)?;
        }
        Ok(relation)
    }

    /// Current href of relation `rid`.
    pub fn href(&self, rid: RelationId) -> Result<Option<String>> {
        let owner = self
            .relation_owner(rid)
            .ok_or_else(|| GraphError::NotFound(format!("relation {rid}")))?;
        self.require(owner)?.href(rid)
    }

    /// Write the href of relation `rid`.
    pub fn set_href(&mut self, rid: RelationId, href: &str) -> Result<()> {
        let owner = self
            .relation_owner(rid)
            .ok_or_else(|| GraphError::NotFound(format!("relation {rid}")))?;
        self.require_mut(owner)?.set_href(rid, href)
    }

    /// The asset whose url relative hrefs of relation `rid` resolve against.
    ///
    /// Walks outward from the source asset through incoming relations until
    /// an asset satisfies the relation type's base asset query.
    pub fn base_asset(&self, rid: RelationId) -> Option<AssetId> {
        let owner = self.relation_owner(rid)?;
        let relation_type = self.relation(rid)?.relation_type();
        self.find_base(owner, relation_type)
    }

    fn find_base(&self, start: AssetId, relation_type: RelationType) -> Option<AssetId> {
        let query = relation_type.base_asset_query();
        let mut queue = VecDeque::from([start]);
        let mut seen = FxHashSet::default();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(asset) = self.assets.get(&id) else {
                continue;
            };
            if query.accepts(asset.asset_type(), asset.url()) {
                return Some(id);
            }
            for rid in self.find_incoming(id) {
                if let Some(owner) = self.relation_owner(rid) {
                    queue.push_back(owner);
                }
            }
        }
        None
    }

    /// Base url for relations of `relation_type` leaving `from`; the graph
    /// root when no ancestor qualifies.
    fn base_url(&self, from: AssetId, relation_type: RelationType) -> String {
        self.find_base(from, relation_type)
            .and_then(|id| self.assets.get(&id))
            .and_then(Asset::url)
            .unwrap_or(self.root.as_str())
            .to_owned()
    }

    /// Recompute the href of `rid` from its base asset and target url.
    ///
    /// Relations whose target has no url (inline assets) are left alone.
    pub fn refresh_href(&mut self, rid: RelationId) -> Result<()> {
        let owner = self
            .relation_owner(rid)
            .ok_or_else(|| GraphError::NotFound(format!("relation {rid}")))?;
        let Some(relation) = self.relation(rid) else {
            return Ok(());
        };
        let target_url = match relation.to() {
            Target::Asset(id) => self.asset(*id).and_then(Asset::url).map(str::to_owned),
            Target::Pending(asset) => asset.url().map(str::to_owned),
            Target::Unresolved(config) => config.url.clone(),
        };
        let Some(target_url) = target_url else {
            return Ok(());
        };
        let base = self.base_url(owner, relation.relation_type());
        let href = build_relative_url(&base, &target_url);
        if self.href(rid)?.as_deref() == Some(href.as_str()) {
            return Ok(());
        }
        self.set_href(rid, &href)
    }

    /// Change the url of asset `id` and keep hrefs consistent.
    ///
    /// Root-relative and relative urls resolve against the graph root.
    /// Incoming hrefs and the asset's own outgoing hrefs are refreshed.
    pub fn set_asset_url(&mut self, id: AssetId, url: &str) -> Result<()> {
        let url = if has_scheme(url) {
            url.to_owned()
        } else if let Some(rest) = url.strip_prefix('/') {
            format!("{}{rest}", self.root)
        } else {
            resolve_url(&self.root, url)
        };
        self.discover(id);
        self.require_mut(id)?.set_url(Some(&url));

        let incoming = self.find_incoming(id);
        let outgoing: Vec<RelationId> = self.require(id)?.relations().iter().map(Relation::id).collect();
        for rid in incoming.into_iter().chain(outgoing) {
            self.refresh_href(rid)?;
        }
        Ok(())
    }

    /// `[Type/id: [source] => [target]]`.
    pub fn describe_relation(&self, rid: RelationId) -> Option<String> {
        let relation = self.relation(rid)?;
        let from = relation
            .from()
            .and_then(|id| self.asset(id))
            .map(ToString::to_string)
            .unwrap_or_else(|| "(detached)".to_owned());
        let to = match relation.to() {
            Target::Asset(id) => self
                .asset(*id)
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("[{id}]")),
            Target::Pending(asset) => asset.to_string(),
            Target::Unresolved(config) => config.url.clone().unwrap_or_else(|| "(inline)".to_owned()),
        };
        Some(format!(
            "[{}/{}: {from} => {to}]",
            relation.relation_type(),
            relation.id()
        ))
    }
}

// =============================================================================
// Queries
// =============================================================================

impl AssetGraph {
    /// Assets matching `query`, in registration order.
    pub fn find_assets(&self, query: &AssetQuery) -> Vec<AssetId> {
        self.assets()
            .filter(|a| query.matches(a))
            .map(Asset::id)
            .collect()
    }

    /// Relations matching `query`: per-source attachment order, sources in
    /// registration order. Unpopulated relations are only included when
    /// `include_unpopulated` is set.
    pub fn find_relations(&mut self, query: &RelationQuery, include_unpopulated: bool) -> Vec<RelationId> {
        for id in self.order.clone() {
            self.discover(id);
        }
        self.assets()
            .flat_map(Asset::relations)
            .filter(|r| include_unpopulated || r.to().is_resolved())
            .filter(|r| query.matches(self, r))
            .map(Relation::id)
            .collect()
    }
}
