//! Fold `<link rel=stylesheet>` elements into `@import`s of inline stylesheets.

use async_trait::async_trait;

use super::Transform;
use crate::asset::{Asset, AssetConfig, AssetType};
use crate::core::AssetId;
use crate::debug;
use crate::error::Result;
use crate::graph::{AssetGraph, AssetQuery, RelationQuery};
use crate::relation::{Position, Relation, RelationType};

/// Imports one inline stylesheet takes before a new one is started.
const MAX_IMPORTS: usize = 32;

/// For every matching Html asset, replace each `HtmlStyle` to a stylesheet
/// with a url by a `CssImport` from an inline stylesheet placed where the
/// first of a run of such links was. Already inline stylesheets end a run;
/// the `<link>` media query moves to the `@import`.
pub struct ConvertHtmlStylesToInlineCssImports {
    query: AssetQuery,
}

impl ConvertHtmlStylesToInlineCssImports {
    pub fn new(query: AssetQuery) -> Self {
        Self { query }
    }
}

#[async_trait]
impl Transform for ConvertHtmlStylesToInlineCssImports {
    fn name(&self) -> &'static str {
        "convertHtmlStylesToInlineCssImports"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        let html_assets: Vec<_> = graph
            .find_assets(&self.query)
            .into_iter()
            .filter(|id| graph.asset(*id).is_some_and(|a| a.asset_type().is_html_like()))
            .collect();

        let mut converted = 0usize;
        for html in html_assets {
            let styles = graph.find_relations(
                &RelationQuery::new()
                    .relation_type(RelationType::HtmlStyle)
                    .from(html),
                false,
            );
            let mut current: Option<AssetId> = None;
            for style in styles {
                let Some(target) = graph.relation(style).and_then(Relation::target) else {
                    continue;
                };
                let Some(target_url) = graph.asset(target).and_then(Asset::url).map(str::to_owned) else {
                    current = None;
                    continue;
                };

                let full = current.is_none_or(|css| {
                    graph
                        .asset(css)
                        .is_none_or(|a| a.relations().len() >= MAX_IMPORTS)
                });
                if full {
                    let sheet = Asset::from_config(AssetConfig::new().with_type(AssetType::Css).with_text(""))?;
                    current = Some(sheet.id());
                    graph.attach_and_add_relation(
                        html,
                        Relation::new(RelationType::HtmlStyle, sheet),
                        Position::Before(style),
                    )?;
                }
                let Some(css) = current else {
                    continue;
                };

                let mut import = Relation::new(RelationType::CssImport, target).with_href(target_url);
                if let Some(media) = graph.asset(html).and_then(|a| a.relation_media(style)) {
                    import = import.with_media(media);
                }
                let rid = graph.attach_and_add_relation(css, import, Position::Last)?;
                graph.refresh_href(rid)?;
                graph.detach_and_remove_relation(style, false)?;
                converted += 1;
            }
        }
        debug!("css"; "{} <link> element(s) folded into inline @imports", converted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(graph: &mut AssetGraph, url: &str, text: &str) -> AssetId {
        let asset = Asset::from_config(AssetConfig::from(url).with_text(text)).unwrap();
        graph.add_asset(asset).unwrap()
    }

    async fn run(graph: &mut AssetGraph) {
        ConvertHtmlStylesToInlineCssImports::new(AssetQuery::new())
            .apply(graph)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_links_become_inline_imports() {
        let mut graph = AssetGraph::new("file:///site/");
        let html = add(
            &mut graph,
            "file:///site/index.html",
            "<html><head>\
             <link rel=stylesheet href=a.css media=print>\
             <style>p{}</style>\
             <link rel=stylesheet href=css/b.css>\
             <link rel=stylesheet href=c.css>\
             </head><body></body></html>",
        );
        for url in ["a.css", "css/b.css", "c.css"] {
            add(&mut graph, &format!("file:///site/{url}"), ".x{y:z}");
        }
        assert_eq!(graph.len(), 5);

        run(&mut graph).await;

        assert_eq!(
            graph.asset_mut(html).unwrap().text().unwrap(),
            "<html><head>\
             <style>@import url(a.css) print;</style>\
             <style>p{}</style>\
             <style>@import url(css/b.css);@import url(c.css);</style>\
             </head><body></body></html>"
        );
        assert_eq!(graph.len(), 7);
        let links = graph.find_relations(
            &RelationQuery::new()
                .relation_type(RelationType::HtmlStyle)
                .to_url("file:///site/c.css"),
            true,
        );
        assert!(links.is_empty());
        let imports = graph.find_relations(
            &RelationQuery::new().relation_type(RelationType::CssImport),
            true,
        );
        assert_eq!(imports.len(), 3);
    }

    #[tokio::test]
    async fn test_inline_sheet_is_split_when_full() {
        let mut graph = AssetGraph::new("file:///site/");
        let links: String = (0..MAX_IMPORTS + 1)
            .map(|i| format!("<link rel=stylesheet href={i}.css>"))
            .collect();
        let html = add(
            &mut graph,
            "file:///site/index.html",
            &format!("<html><head>{links}</head><body></body></html>"),
        );
        for i in 0..=MAX_IMPORTS {
            add(&mut graph, &format!("file:///site/{i}.css"), "a{b:c}");
        }

        run(&mut graph).await;

        let text = graph.asset_mut(html).unwrap().text().unwrap().to_owned();
        assert_eq!(text.matches("<style>").count(), 2);
        assert!(text.contains(&format!("<style>@import url({MAX_IMPORTS}.css);</style>")));
        assert!(!text.contains("<link"));
    }
}
