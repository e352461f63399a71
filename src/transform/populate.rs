//! Follow relations outward from the initial assets.

use std::sync::Arc;

use async_trait::async_trait;

use super::Transform;
use super::loader::AssetLoader;
use crate::core::url::same_origin;
use crate::debug;
use crate::error::Result;
use crate::graph::{AssetGraph, AssetQuery, Matcher, RelationQuery};
use crate::relation::RelationType;

/// Populate the graph from the seed assets (initial assets by default).
///
/// Without an explicit follow query, relations are followed when their
/// target stays within the origin of the graph root (any origin with
/// [`Populate::external`]) and, if given, has one of the allowed types.
pub struct Populate {
    loader: Arc<dyn AssetLoader>,
    from: AssetQuery,
    follow: Option<RelationQuery>,
    relation_types: Vec<RelationType>,
    external: bool,
}

impl Populate {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            loader,
            from: AssetQuery::new().initial(true),
            follow: None,
            relation_types: Vec::new(),
            external: false,
        }
    }

    /// Seed assets to start from.
    pub fn seeds(mut self, query: AssetQuery) -> Self {
        self.from = query;
        self
    }

    /// Replace the default follow query entirely.
    pub fn follow(mut self, query: RelationQuery) -> Self {
        self.follow = Some(query);
        self
    }

    /// Only follow these relation types. Empty means all.
    pub fn relation_types(mut self, types: Vec<RelationType>) -> Self {
        self.relation_types = types;
        self
    }

    /// Also follow relations leaving the root's origin.
    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    fn follow_query(&self, root: &str) -> RelationQuery {
        if let Some(query) = &self.follow {
            return query.clone();
        }
        let mut query = RelationQuery::new();
        if !self.relation_types.is_empty() {
            query = query.relation_type(self.relation_types.clone());
        }
        if !self.external {
            let root = root.to_owned();
            query = query.to_url(Matcher::test(move |url: &String| same_origin(url, &root)));
        }
        query
    }
}

#[async_trait]
impl Transform for Populate {
    fn name(&self) -> &'static str {
        "populate"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        let seeds = graph.find_assets(&self.from);
        let follow = self.follow_query(graph.root());
        let added = graph
            .populate(&seeds, &follow, Arc::clone(&self.loader))
            .await?;
        debug!("populate"; "{} seed(s), {} asset(s) added", seeds.len(), added.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetType};
    use crate::transform::{LoadAssets, MemoryLoader};

    fn site() -> Arc<dyn AssetLoader> {
        Arc::new(
            MemoryLoader::new()
                .with(
                    "file:///site/index.html",
                    "<html><head><link rel=stylesheet href=css/main.css></head><body><a href=about.html>a</a><a href=http://other.example/x.html>x</a></body></html>",
                )
                .with("file:///site/about.html", "<a href=index.html>home</a>")
                .with("file:///site/css/main.css", "@import 'reset.css';\nbody { background: url(../img/bg.png) }")
                .with("file:///site/css/reset.css", "*{margin:0}")
                .with("file:///site/img/bg.png", vec![0x89, b'P', b'N', b'G']),
        )
    }

    async fn load(graph: &mut AssetGraph, populate: Populate) {
        LoadAssets::new(site(), ["index.html"]).apply(graph).await.unwrap();
        populate.apply(graph).await.unwrap();
    }

    #[tokio::test]
    async fn test_populate_follows_same_origin() {
        let mut graph = AssetGraph::new("file:///site/");
        load(&mut graph, Populate::new(site())).await;

        let urls: Vec<_> = graph.assets().filter_map(Asset::url).collect();
        assert_eq!(
            urls,
            [
                "file:///site/index.html",
                "file:///site/css/main.css",
                "file:///site/about.html",
                "file:///site/css/reset.css",
                "file:///site/img/bg.png",
            ]
        );

        // The cycle back to index.html reuses the registered asset.
        let index = graph.asset_by_url("file:///site/index.html").unwrap();
        assert_eq!(graph.find_incoming(index).len(), 1);

        let all = graph.find_relations(&RelationQuery::new(), false);
        let with_external = graph.find_relations(&RelationQuery::new(), true);
        assert_eq!(all.len(), 5);
        assert_eq!(with_external.len(), 6);
    }

    #[tokio::test]
    async fn test_populate_relation_type_filter() {
        let mut graph = AssetGraph::new("file:///site/");
        load(
            &mut graph,
            Populate::new(site()).relation_types(vec![RelationType::HtmlStyle, RelationType::CssImport]),
        )
        .await;
        let types: Vec<_> = graph.assets().map(Asset::asset_type).collect();
        assert_eq!(types, [AssetType::Html, AssetType::Css, AssetType::Css]);
    }

    #[tokio::test]
    async fn test_populate_reports_missing_targets_once() {
        let loader: Arc<dyn AssetLoader> = Arc::new(
            MemoryLoader::new().with("file:///site/a.html", "<img src=x.png><img src=x.png>"),
        );
        let mut graph = AssetGraph::new("file:///site/");
        let errors = Arc::new(parking_lot::Mutex::new(0usize));
        let sink = Arc::clone(&errors);
        graph.on_error(move |_| *sink.lock() += 1);

        LoadAssets::new(Arc::clone(&loader), ["a.html"]).apply(&mut graph).await.unwrap();
        Populate::new(loader).apply(&mut graph).await.unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(*errors.lock(), 1);
        assert_eq!(graph.find_relations(&RelationQuery::new(), true).len(), 2);
    }
}
