//! Print the whole graph.

use async_trait::async_trait;

use super::Transform;
use crate::error::Result;
use crate::graph::AssetGraph;
use crate::log;

/// Log every asset and its outgoing relations (populated or not) in graph
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpGraph;

impl DumpGraph {
    /// One line per asset, followed by one indented line per relation.
    pub fn lines(graph: &mut AssetGraph) -> Vec<String> {
        graph.sync_inline();
        let mut lines = Vec::new();
        for id in graph.asset_ids().to_vec() {
            let rids = graph.find_outgoing(id);
            let Some(asset) = graph.asset(id) else {
                continue;
            };
            let mut line = asset.to_string();
            if asset.is_dirty() {
                line.push_str(" (dirty)");
            }
            if !asset.is_loaded() {
                line.push_str(" (unloaded)");
            }
            lines.push(line);

            for rid in rids {
                let description = graph.describe_relation(rid).unwrap_or_default();
                let href = graph.href(rid).ok().flatten().unwrap_or_default();
                lines.push(format!("    {description} href={href}"));
            }
        }
        lines
    }
}

#[async_trait]
impl Transform for DumpGraph {
    fn name(&self) -> &'static str {
        "dumpGraph"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        for line in Self::lines(graph) {
            log!("dump"; "{}", line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetConfig};

    #[test]
    fn test_lines() {
        let mut graph = AssetGraph::new("file:///site/");
        let html = Asset::from_config(
            AssetConfig::from("file:///site/index.html").with_text("<script src=app.js></script>"),
        )
        .unwrap();
        let html = graph.add_asset(html).unwrap();
        let js = Asset::new(crate::asset::AssetType::JavaScript, Some("file:///site/app.js"));
        let js = graph.add_asset(js).unwrap();

        let lines = DumpGraph::lines(&mut graph);
        assert_eq!(
            lines,
            [
                format!("[Html/{html} file:///site/index.html]"),
                format!(
                    "    [HtmlScript/{}: [Html/{html} file:///site/index.html] => [JavaScript/{js} file:///site/app.js]] href=app.js",
                    graph.find_incoming(js)[0]
                ),
                format!("[JavaScript/{js} file:///site/app.js] (unloaded)"),
            ]
        );
    }
}
