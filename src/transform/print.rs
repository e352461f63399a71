//! Pretty-print or minify assets.

use async_trait::async_trait;

use super::Transform;
use crate::asset::Asset;
use crate::debug;
use crate::error::Result;
use crate::graph::{AssetGraph, AssetQuery};

fn each_printable(
    graph: &mut AssetGraph,
    query: &AssetQuery,
    op: fn(&mut Asset) -> Result<()>,
) -> Result<usize> {
    let mut count = 0;
    for id in graph.find_assets(query) {
        if let Some(asset) = graph.asset_mut(id)
            && asset.asset_type().is_pretty_printable()
            && asset.is_loaded()
        {
            op(asset)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Pretty-print matching Css, JavaScript and Json assets.
pub struct PrettyPrintAssets {
    query: AssetQuery,
}

impl PrettyPrintAssets {
    pub fn new(query: AssetQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl Transform for PrettyPrintAssets {
    fn name(&self) -> &'static str {
        "prettyPrintAssets"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        let count = each_printable(graph, &self.query, Asset::pretty_print)?;
        debug!("print"; "{} asset(s) pretty-printed", count);
        Ok(())
    }
}

/// Minify matching Css, JavaScript and Json assets.
pub struct MinifyAssets {
    query: AssetQuery,
}

impl MinifyAssets {
    pub fn new(query: AssetQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl Transform for MinifyAssets {
    fn name(&self) -> &'static str {
        "minifyAssets"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        let count = each_printable(graph, &self.query, Asset::minify)?;
        debug!("print"; "{} asset(s) minified", count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetConfig;

    fn graph() -> AssetGraph {
        let mut graph = AssetGraph::new("file:///site/");
        for (url, text) in [
            ("file:///site/a.css", "a  { color : red ; }"),
            ("file:///site/a.json", "{ \"x\" : [ 1 ] }"),
            ("file:///site/a.html", "<p>  keep  </p>"),
        ] {
            let asset = Asset::from_config(AssetConfig::from(url).with_text(text)).unwrap();
            graph.add_asset(asset).unwrap();
        }
        graph
    }

    fn texts(graph: &mut AssetGraph) -> Vec<String> {
        graph
            .asset_ids()
            .to_vec()
            .into_iter()
            .map(|id| graph.asset_mut(id).unwrap().text().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_pretty_then_minify() {
        let mut graph = graph();
        let pretty = PrettyPrintAssets::new(AssetQuery::new());
        pretty.apply(&mut graph).await.unwrap();
        let once = texts(&mut graph);
        pretty.apply(&mut graph).await.unwrap();
        assert_eq!(texts(&mut graph), once);
        assert_eq!(once, ["a {\n  color: red;\n}\n", "{\n    \"x\": [\n        1\n    ]\n}\n", "<p>  keep  </p>"]);

        let minify = MinifyAssets::new(AssetQuery::new());
        minify.apply(&mut graph).await.unwrap();
        let once = texts(&mut graph);
        minify.apply(&mut graph).await.unwrap();
        assert_eq!(texts(&mut graph), once);
        assert_eq!(once, ["a{color:red}", "{\"x\":[1]}", "<p>  keep  </p>"]);
    }
}
