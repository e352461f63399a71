//! Transitive discovery of assets from a set of seeds.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{AssetGraph, RelationQuery};
use crate::asset::AssetConfig;
use crate::core::{AssetId, GraphEvent, RelationId};
use crate::debug;
use crate::error::{GraphError, Result};
use crate::relation::Target;
use crate::transform::loader::{AssetLoader, load_asset};

impl AssetGraph {
    /// Follow relations matching `follow` outward from `seeds`, loading and
    /// registering every newly discovered target exactly once.
    ///
    /// Work proceeds in rounds: all targets discovered in one round are
    /// fetched in parallel and registered in discovery order. Url targets
    /// reuse the registered asset with that url; inline targets never merge.
    /// Failed loads are reported on the error channel and not retried.
    ///
    /// Returns the newly registered assets.
    pub async fn populate(
        &mut self,
        seeds: &[AssetId],
        follow: &RelationQuery,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<Vec<AssetId>> {
        let mut visited: FxHashSet<AssetId> = seeds.iter().copied().collect();
        let mut frontier: Vec<AssetId> = seeds.to_vec();
        let mut failed: FxHashSet<String> = FxHashSet::default();
        let mut added = Vec::new();
        let mut round = 0usize;

        while !frontier.is_empty() {
            round += 1;
            let mut next = Vec::new();
            let mut jobs: Vec<AssetConfig> = Vec::new();
            let mut by_url: FxHashMap<String, usize> = FxHashMap::default();
            let mut links: Vec<(RelationId, usize)> = Vec::new();

            for id in frontier {
                self.discover(id);
                for (rid, target) in self.followed(id, follow) {
                    match target {
                        Followed::Asset(target) => {
                            if visited.insert(target) {
                                next.push(target);
                            }
                        }
                        Followed::Config(config) => {
                            if let Some(url) = config.url.as_deref() {
                                if failed.contains(url) {
                                    continue;
                                }
                                if let Some(existing) = self.asset_by_url(url) {
                                    self.set_target(rid, existing);
                                    if visited.insert(existing) {
                                        next.push(existing);
                                    }
                                    continue;
                                }
                                if let Some(&job) = by_url.get(url) {
                                    links.push((rid, job));
                                    continue;
                                }
                                by_url.insert(url.to_owned(), jobs.len());
                            }
                            links.push((rid, jobs.len()));
                            jobs.push(config);
                        }
                    }
                }
            }

            debug!("populate"; "round {}: {} to load, {} already known", round, jobs.len(), next.len());

            let handles: Vec<_> = jobs
                .iter()
                .cloned()
                .map(|config| {
                    let loader = Arc::clone(&loader);
                    tokio::spawn(async move { load_asset(loader.as_ref(), config).await })
                })
                .collect();

            let mut created: Vec<Option<AssetId>> = Vec::with_capacity(jobs.len());
            for (handle, config) in handles.into_iter().zip(&jobs) {
                let outcome = handle
                    .await
                    .unwrap_or_else(|e| Err(GraphError::Task(e.to_string())));
                match outcome {
                    Ok(asset) => {
                        let id = self.add_asset(asset)?;
                        visited.insert(id);
                        next.push(id);
                        added.push(id);
                        created.push(Some(id));
                    }
                    Err(err) => {
                        if let Some(url) = &config.url {
                            failed.insert(url.clone());
                        }
                        self.events.emit(GraphEvent::from_error(&err).with_url(config.url.as_deref()));
                        created.push(None);
                    }
                }
            }

            for (rid, job) in links {
                if let Some(Some(target)) = created.get(job) {
                    self.set_target(rid, *target);
                }
            }
            frontier = next;
        }

        debug!("populate"; "{} asset(s) added in {} round(s)", added.len(), round);
        Ok(added)
    }

    /// Relations of `id` matching `follow`, with what they point at.
    fn followed(&self, id: AssetId, follow: &RelationQuery) -> Vec<(RelationId, Followed)> {
        let Some(asset) = self.asset(id) else {
            return Vec::new();
        };
        asset
            .relations()
            .iter()
            .filter(|r| follow.matches(self, r))
            .filter_map(|r| {
                let target = match r.to() {
                    Target::Asset(target) => Followed::Asset(*target),
                    Target::Unresolved(config) => Followed::Config(config.clone()),
                    Target::Pending(_) => return None,
                };
                Some((r.id(), target))
            })
            .collect()
    }
}

enum Followed {
    Asset(AssetId),
    Config(AssetConfig),
}
