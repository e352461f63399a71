//! Two-phase loading of input assets.
//!
//! 1. Resolve: every input is expanded by the loader (glob fan-out) in
//!    parallel. The phase completes before any byte is fetched.
//! 2. Load: every resolved config is fetched in parallel. Successful assets
//!    are registered after the whole phase, in resolved order, flagged
//!    initial.
//!
//! A failed load is reported on the graph's error channel and skipped. When
//! nobody listens for errors the first failure (in config order) fails the
//! transform instead, and nothing is registered.

use std::sync::Arc;

use async_trait::async_trait;

use super::Transform;
use super::loader::{AssetLoader, load_asset};
use crate::asset::{Asset, AssetConfig};
use crate::core::url::{has_scheme, resolve_url};
use crate::core::{EventKind, GraphEvent, UrlMatcher};
use crate::debug;
use crate::error::{GraphError, Result};
use crate::graph::AssetGraph;

/// Load input assets into the graph.
pub struct LoadAssets {
    loader: Arc<dyn AssetLoader>,
    inputs: Vec<AssetConfig>,
    keep_unloaded: Option<UrlMatcher>,
}

impl LoadAssets {
    pub fn new<I, C>(loader: Arc<dyn AssetLoader>, inputs: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<AssetConfig>,
    {
        Self {
            loader,
            inputs: inputs.into_iter().map(Into::into).collect(),
            keep_unloaded: None,
        }
    }

    /// Register inputs matching `matcher` without fetching their bytes.
    pub fn keep_unloaded(mut self, matcher: UrlMatcher) -> Self {
        self.keep_unloaded = (!matcher.is_empty()).then_some(matcher);
        self
    }

    /// Make an input url absolute: `/x` is relative to the graph root, as is
    /// any other scheme-less url.
    fn absolutize(root: &str, mut config: AssetConfig) -> AssetConfig {
        if let Some(url) = config.url.take() {
            config.url = Some(if has_scheme(&url) {
                url
            } else if let Some(rest) = url.strip_prefix('/') {
                format!("{root}{rest}")
            } else {
                resolve_url(root, &url)
            });
        }
        config
    }

    /// Report `err`, or hand it back when nobody is listening.
    fn recover(graph: &AssetGraph, err: GraphError, url: Option<&str>) -> Result<()> {
        if graph.events().has_listener(EventKind::Error) {
            graph.events().emit(GraphEvent::from_error(&err).with_url(url));
            Ok(())
        } else {
            Err(err)
        }
    }

    async fn resolve_all(&self, graph: &AssetGraph) -> Result<Vec<AssetConfig>> {
        let handles: Vec<_> = self
            .inputs
            .iter()
            .cloned()
            .map(|config| {
                let config = Self::absolutize(graph.root(), config);
                let loader = Arc::clone(&self.loader);
                tokio::spawn(async move {
                    let url = config.url.clone();
                    (url, loader.resolve(config).await)
                })
            })
            .collect();

        let mut resolved = Vec::new();
        for handle in handles {
            let (url, outcome) = handle
                .await
                .map_err(|e| GraphError::Task(e.to_string()))?;
            match outcome {
                Ok(configs) => resolved.extend(configs),
                Err(err) => Self::recover(graph, err, url.as_deref())?,
            }
        }
        Ok(resolved)
    }

    async fn load_all(&self, graph: &AssetGraph, configs: Vec<AssetConfig>) -> Result<Vec<Asset>> {
        let handles: Vec<_> = configs
            .into_iter()
            .map(|config| {
                let keep = self
                    .keep_unloaded
                    .as_ref()
                    .zip(config.url.as_deref())
                    .is_some_and(|(m, url)| m.matches(url));
                let config = if keep { config.keep_unloaded(true) } else { config };
                let config = config.initial(true);
                let loader = Arc::clone(&self.loader);
                tokio::spawn(async move {
                    let url = config.url.clone();
                    (url, load_asset(loader.as_ref(), config).await)
                })
            })
            .collect();

        let mut assets = Vec::with_capacity(handles.len());
        for handle in handles {
            let (url, outcome) = handle
                .await
                .map_err(|e| GraphError::Task(e.to_string()))?;
            match outcome {
                Ok(asset) => assets.push(asset),
                Err(err) => Self::recover(graph, err, url.as_deref())?,
            }
        }
        Ok(assets)
    }
}

#[async_trait]
impl Transform for LoadAssets {
    fn name(&self) -> &'static str {
        "loadAssets"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        let configs = self.resolve_all(graph).await?;
        debug!("load"; "{} input(s) resolved to {} asset(s)", self.inputs.len(), configs.len());

        let assets = self.load_all(graph, configs).await?;
        let mut added = 0usize;
        for asset in assets {
            if let Some(url) = asset.url()
                && let Some(existing) = graph.asset_by_url(url)
            {
                debug!("load"; "{} already loaded as asset {}", url, existing);
                continue;
            }
            graph.add_asset(asset)?;
            added += 1;
        }
        debug!("load"; "{} asset(s) registered", added);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::asset::AssetType;
    use crate::core::GraphEvent;
    use crate::graph::AssetQuery;
    use crate::transform::MemoryLoader;

    fn loader() -> Arc<dyn AssetLoader> {
        Arc::new(
            MemoryLoader::new()
                .with("file:///site/good.json", r#"{"ok": true}"#)
                .with("file:///site/index.html", "<p>hi</p>"),
        )
    }

    #[tokio::test]
    async fn test_failed_load_is_reported_with_listener() {
        let mut graph = AssetGraph::new("file:///site/");
        let errors = Arc::new(Mutex::new(Vec::<GraphEvent>::new()));
        let sink = Arc::clone(&errors);
        graph.on_error(move |e| sink.lock().push(e.clone()));

        LoadAssets::new(loader(), ["good.json", "missing.json"])
            .apply(&mut graph)
            .await
            .unwrap();

        let urls: Vec<_> = graph.assets().filter_map(Asset::url).collect();
        assert_eq!(urls, ["file:///site/good.json"]);
        assert!(graph.assets().all(Asset::is_initial));

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].url.as_deref(), Some("file:///site/missing.json"));
        assert!(errors[0].message.contains("missing.json"));
    }

    #[tokio::test]
    async fn test_failed_load_aborts_without_listener() {
        let mut graph = AssetGraph::new("file:///site/");
        let err = LoadAssets::new(loader(), ["good.json", "missing.json"])
            .apply(&mut graph)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Load { ref url, .. } if url == "file:///site/missing.json"));
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_registration_follows_input_order() {
        let mut graph = AssetGraph::new("file:///site/");
        LoadAssets::new(loader(), ["/index.html", "file:///site/good.json"])
            .apply(&mut graph)
            .await
            .unwrap();
        let types: Vec<_> = graph.assets().map(Asset::asset_type).collect();
        assert_eq!(types, [AssetType::Html, AssetType::Json]);
        assert_eq!(graph.find_assets(&AssetQuery::new().initial(true)).len(), 2);
    }

    #[tokio::test]
    async fn test_inline_and_keep_unloaded_inputs() {
        let mut graph = AssetGraph::new("file:///site/");
        let inline = AssetConfig::new().with_type(AssetType::Css).with_text("a{b:c}");
        LoadAssets::new(loader(), [inline, AssetConfig::from("huge.png")])
            .keep_unloaded(UrlMatcher::new(["/site/*.png"]).unwrap())
            .apply(&mut graph)
            .await
            .unwrap();

        assert_eq!(graph.len(), 2);
        let png = graph.assets().nth(1).unwrap();
        assert_eq!(png.asset_type(), AssetType::Png);
        assert!(!png.is_loaded());
        assert!(graph.assets().next().unwrap().is_inline());
    }
}
