//! Cycle-safe depth-first postorder traversal.

use rustc_hash::FxHashSet;

use super::{AssetGraph, RelationQuery};
use crate::core::{AssetId, GraphEvent, RelationId};
use crate::debug;
use crate::error::Result;

/// Where a traversal starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Asset(AssetId),
    /// The target of a relation, visited as if reached through it.
    Relation(RelationId),
}

impl From<AssetId> for Origin {
    fn from(id: AssetId) -> Self {
        Self::Asset(id)
    }
}

impl From<RelationId> for Origin {
    fn from(id: RelationId) -> Self {
        Self::Relation(id)
    }
}

type Visit<'a> = dyn FnMut(&mut AssetGraph, AssetId, Option<RelationId>) -> Result<()> + 'a;

struct Walk {
    /// Assets on the current path.
    path: FxHashSet<AssetId>,
    visited: FxHashSet<AssetId>,
}

impl AssetGraph {
    /// Depth-first postorder traversal following relations that match
    /// `query`.
    ///
    /// `visit` is called exactly once per reachable asset, after all of its
    /// matching children, with the relation it was reached through. An edge
    /// back onto the current path is skipped and reported as a warning.
    pub fn each_asset_post_order<F>(
        &mut self,
        start: impl Into<Origin>,
        query: &RelationQuery,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(&mut AssetGraph, AssetId, Option<RelationId>) -> Result<()>,
    {
        let (id, via) = match start.into() {
            Origin::Asset(id) => (id, None),
            Origin::Relation(rid) => match self.relation(rid).and_then(|r| r.target()) {
                Some(target) => (target, Some(rid)),
                None => return Ok(()),
            },
        };
        let mut walk = Walk {
            path: FxHashSet::default(),
            visited: FxHashSet::default(),
        };
        self.post_order(id, via, query, &mut walk, &mut visit)
    }

    fn post_order(
        &mut self,
        id: AssetId,
        via: Option<RelationId>,
        query: &RelationQuery,
        walk: &mut Walk,
        visit: &mut Visit<'_>,
    ) -> Result<()> {
        if !walk.visited.insert(id) {
            return Ok(());
        }
        walk.path.insert(id);

        self.discover(id);
        let children: Vec<(RelationId, AssetId)> = self
            .asset(id)
            .map(|asset| {
                asset
                    .relations()
                    .iter()
                    .filter(|r| query.matches(self, r))
                    .filter_map(|r| r.target().map(|t| (r.id(), t)))
                    .collect()
            })
            .unwrap_or_default();

        for (rid, child) in children {
            if walk.path.contains(&child) {
                let description = self.describe_relation(rid).unwrap_or_default();
                debug!("traverse"; "cycle at {}", description);
                let url = self.asset(child).and_then(|a| a.url()).map(str::to_owned);
                self.events.emit(
                    GraphEvent::warn(format!("cycle detected, not following {description}"))
                        .with_url(url.as_deref())
                        .with_asset(child),
                );
                continue;
            }
            self.post_order(child, Some(rid), query, walk, visit)?;
        }

        walk.path.remove(&id);
        visit(self, id, via)
    }
}
