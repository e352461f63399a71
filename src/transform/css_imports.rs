//! Hoist CSS `@import`s into `<link rel=stylesheet>` elements.

use async_trait::async_trait;

use super::Transform;
use crate::debug;
use crate::error::Result;
use crate::graph::{AssetGraph, AssetQuery, RelationQuery};
use crate::relation::{Position, Relation, RelationType};

/// For every stylesheet linked from a matching Html asset, replace each
/// `@import` (recursively, deepest first) with an `HtmlStyle` inserted before
/// the original one. The import's media query moves to the new element.
pub struct ConvertCssImportsToHtmlStyles {
    query: AssetQuery,
}

impl ConvertCssImportsToHtmlStyles {
    pub fn new(query: AssetQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl Transform for ConvertCssImportsToHtmlStyles {
    fn name(&self) -> &'static str {
        "convertCssImportsToHtmlStyles"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        let imports = RelationQuery::new().relation_type(RelationType::CssImport);
        let html_assets: Vec<_> = graph
            .find_assets(&self.query)
            .into_iter()
            .filter(|id| graph.asset(*id).is_some_and(|a| a.asset_type().is_html_like()))
            .collect();

        let mut hoisted = 0usize;
        for html in html_assets {
            let styles = graph.find_relations(
                &RelationQuery::new()
                    .relation_type(RelationType::HtmlStyle)
                    .from(html),
                false,
            );
            for style in styles {
                graph.each_asset_post_order(style, &imports, |graph, css, incoming| {
                    let Some(import) = incoming else {
                        return Ok(());
                    };
                    let Some((owner, relation_type)) = graph
                        .relation(import)
                        .and_then(|r| Some((r.from()?, r.relation_type())))
                    else {
                        return Ok(());
                    };
                    if relation_type != RelationType::CssImport {
                        return Ok(());
                    }
                    let media = graph.asset(owner).and_then(|a| a.relation_media(import));

                    let mut link = Relation::new(RelationType::HtmlStyle, css);
                    if let Some(media) = media {
                        link = link.with_media(media);
                    }
                    graph.attach_and_add_relation(html, link, Position::Before(style))?;
                    graph.detach_and_remove_relation(import, false)?;
                    hoisted += 1;
                    Ok(())
                })?;
            }
        }
        debug!("css"; "{} @import(s) hoisted into <link> elements", hoisted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetConfig};

    fn add(graph: &mut AssetGraph, url: &str, text: &str) {
        let asset = Asset::from_config(AssetConfig::from(url).with_text(text)).unwrap();
        graph.add_asset(asset).unwrap();
    }

    fn text(graph: &mut AssetGraph, url: &str) -> String {
        let id = graph.asset_by_url(url).unwrap();
        graph.asset_mut(id).unwrap().text().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_imports_become_html_styles() {
        let mut graph = AssetGraph::new("file:///site/");
        add(
            &mut graph,
            "file:///site/index.html",
            "<html><head><link rel=stylesheet href=main.css></head><body></body></html>",
        );
        add(
            &mut graph,
            "file:///site/main.css",
            "@import 'a.css' print;\n@import 'b.css';\nbody { color: red }",
        );
        add(&mut graph, "file:///site/a.css", "@import 'c.css';\n.a { x: y }");
        add(&mut graph, "file:///site/b.css", ".b { x: y }");
        add(&mut graph, "file:///site/c.css", ".c { x: y }");

        ConvertCssImportsToHtmlStyles::new(AssetQuery::new())
            .apply(&mut graph)
            .await
            .unwrap();

        assert_eq!(
            text(&mut graph, "file:///site/index.html"),
            "<html><head>\
             <link rel=\"stylesheet\" href=\"c.css\">\
             <link rel=\"stylesheet\" href=\"a.css\" media=\"print\">\
             <link rel=\"stylesheet\" href=\"b.css\">\
             <link rel=stylesheet href=main.css>\
             </head><body></body></html>"
        );
        assert_eq!(text(&mut graph, "file:///site/main.css"), "body{color:red}");
        assert_eq!(text(&mut graph, "file:///site/a.css"), ".a{x:y}");

        let imports = graph.find_relations(
            &RelationQuery::new().relation_type(RelationType::CssImport),
            true,
        );
        assert!(imports.is_empty());
        assert_eq!(graph.len(), 5);
    }
}
