//! Change asset urls while keeping every href pointing at them valid.

use std::sync::Arc;

use async_trait::async_trait;

use super::Transform;
use crate::asset::Asset;
use crate::core::url::{resolve_url, strip_query_fragment};
use crate::debug;
use crate::error::Result;
use crate::graph::{AssetGraph, AssetQuery};

type UrlFn = dyn Fn(&Asset, &AssetGraph) -> Option<String> + Send + Sync;

/// Target url of a move.
#[derive(Clone)]
pub enum NewUrl {
    Fixed(String),
    /// Computed per asset; `None` leaves the asset where it is.
    Computed(Arc<UrlFn>),
}

impl NewUrl {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Asset, &AssetGraph) -> Option<String> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }
}

impl From<&str> for NewUrl {
    fn from(url: &str) -> Self {
        Self::Fixed(url.to_owned())
    }
}

impl From<String> for NewUrl {
    fn from(url: String) -> Self {
        Self::Fixed(url)
    }
}

/// Move the assets matching a query.
///
/// - a target ending in `/` keeps the old file name, query and fragment
/// - `/x` is relative to the graph root, as is any other relative target
///
/// Hrefs of relations pointing at (and leaving) moved assets are refreshed.
pub struct MoveAssets {
    query: AssetQuery,
    new_url: NewUrl,
}

impl MoveAssets {
    pub fn new(query: AssetQuery, new_url: impl Into<NewUrl>) -> Self {
        Self {
            query,
            new_url: new_url.into(),
        }
    }

    fn target_url(&self, asset: &Asset, graph: &AssetGraph) -> Option<String> {
        let mut url = match &self.new_url {
            NewUrl::Fixed(url) => url.clone(),
            NewUrl::Computed(f) => f(asset, graph)?,
        };
        if url.is_empty() {
            return None;
        }
        if url.ends_with('/')
            && let Some(old) = asset.url()
        {
            let name_start = strip_query_fragment(old).rfind('/').map_or(0, |i| i + 1);
            url.push_str(&old[name_start..]);
        }
        Some(match url.strip_prefix('/') {
            Some(rest) => format!("{}{rest}", graph.root()),
            None => resolve_url(graph.root(), &url),
        })
    }
}

#[async_trait]
impl Transform for MoveAssets {
    fn name(&self) -> &'static str {
        "moveAssets"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        for id in graph.find_assets(&self.query) {
            let Some(asset) = graph.asset(id) else {
                continue;
            };
            let Some(url) = self.target_url(asset, graph) else {
                continue;
            };
            debug!("move"; "{} -> {}", asset, url);
            graph.set_asset_url(id, &url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetConfig, AssetType};

    fn graph() -> AssetGraph {
        let mut graph = AssetGraph::new("file:///site/");
        let html = Asset::from_config(
            AssetConfig::from("file:///site/index.html")
                .with_text("<html><head><link rel=stylesheet href=style.css?v=1></head><body><img src=img/a.png></body></html>"),
        )
        .unwrap();
        let css = Asset::from_config(
            AssetConfig::from("file:///site/style.css?v=1").with_text("body{background-image:url(img/a.png)}"),
        )
        .unwrap();
        let png = Asset::from_config(AssetConfig::from("file:///site/img/a.png").with_raw_bytes(vec![1, 2])).unwrap();
        graph.add_asset(html).unwrap();
        graph.add_asset(css).unwrap();
        graph.add_asset(png).unwrap();
        graph
    }

    fn text(graph: &mut AssetGraph, url: &str) -> String {
        let id = graph.asset_by_url(url).unwrap();
        graph.asset_mut(id).unwrap().text().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_move_to_directory_keeps_file_name() {
        let mut graph = graph();
        MoveAssets::new(AssetQuery::new().asset_type(AssetType::Css), "/static/css/")
            .apply(&mut graph)
            .await
            .unwrap();

        assert!(graph.asset_by_url("file:///site/static/css/style.css?v=1").is_some());
        assert_eq!(
            text(&mut graph, "file:///site/index.html"),
            "<html><head><link rel=\"stylesheet\" href=\"static/css/style.css?v=1\"></head><body><img src=img/a.png></body></html>"
        );
        // Outgoing hrefs of the moved stylesheet follow it.
        assert_eq!(
            text(&mut graph, "file:///site/static/css/style.css?v=1"),
            "body{background-image:url(../../img/a.png)}"
        );
    }

    #[tokio::test]
    async fn test_move_with_function() {
        let mut graph = graph();
        let rename = NewUrl::computed(|asset, _| {
            (asset.asset_type() == AssetType::Png).then(|| "media/b.png".to_owned())
        });
        MoveAssets::new(AssetQuery::new(), rename)
            .apply(&mut graph)
            .await
            .unwrap();

        assert!(graph.asset_by_url("file:///site/media/b.png").is_some());
        assert!(text(&mut graph, "file:///site/index.html").contains("<img src=\"media/b.png\">"));
        assert_eq!(
            text(&mut graph, "file:///site/style.css?v=1"),
            "body{background-image:url(media/b.png)}"
        );
    }
}
