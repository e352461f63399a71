//! Build a graph from the project configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use assetgraph::debug;
use assetgraph::graph::{AssetGraph, AssetQuery};
use assetgraph::transform::{
    AssetLoader, FsLoader, LoadAssets, Pipeline, Populate, PrettyPrintAssets,
};

use super::Report;
use crate::config::SiteConfig;

/// Load the configured inputs, populate and optionally pretty-print.
///
/// Load and parse failures end up in the returned [`Report`]; only
/// structural failures are returned as errors.
pub async fn build_graph(config: &SiteConfig) -> Result<(AssetGraph, Report)> {
    let mut graph = AssetGraph::new(&config.root_url());
    let report = Report::attach(&graph);

    let inputs = config.input_urls();
    if inputs.is_empty() {
        anyhow::bail!("no inputs given; pass INPUTS or set `[load] inputs`");
    }
    debug!("load"; "{} input(s) under {}", inputs.len(), graph.root());

    let loader: Arc<dyn AssetLoader> = Arc::new(FsLoader);
    let mut pipeline =
        Pipeline::new().pipe(LoadAssets::new(Arc::clone(&loader), inputs).keep_unloaded(config.keep_unloaded()?));
    if config.populate.enable {
        pipeline = pipeline.pipe(
            Populate::new(loader)
                .relation_types(config.follow_types()?)
                .external(config.populate.external),
        );
    }
    if config.output.pretty {
        pipeline = pipeline.pipe(PrettyPrintAssets::new(AssetQuery::new()));
    }

    pipeline
        .run(&mut graph)
        .await
        .context("failed to build the asset graph")?;
    Ok((graph, report))
}
