//! Href accessors: how each relation type reads, writes, creates and removes
//! its node in the source asset's structured form.

use super::{Binding, RelationType};
use crate::asset::{AssetType, ParseTree};
use crate::error::{GraphError, Result};
use crate::syntax::css::Stylesheet;
use crate::syntax::html::{Element, HtmlDocument};

/// A relation found while scanning a structured form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Found {
    pub relation_type: RelationType,
    pub binding: Binding,
    pub target: FoundTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FoundTarget {
    Href(String),
    /// Content of a `<style>` or `<script>` element.
    Inline(AssetType, String),
}

/// Where a new node goes, expressed in terms of the structured form.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Placement {
    First,
    Last,
    Before(Binding),
    After(Binding),
}

// =============================================================================
// Discovery
// =============================================================================

/// Every relation in `tree`, in document order.
pub(crate) fn discover(tree: &ParseTree) -> Vec<Found> {
    match tree {
        ParseTree::Html(doc) => discover_html(doc),
        ParseTree::Css(sheet) => discover_css(sheet),
        ParseTree::Json(_) | ParseTree::JavaScript(_) => Vec::new(),
    }
}

fn is_javascript_type(el: &Element) -> bool {
    match el.attr("type").map(str::trim) {
        None | Some("") | Some("module") => true,
        Some(t) => t.to_ascii_lowercase().contains("javascript"),
    }
}

fn discover_html(doc: &HtmlDocument) -> Vec<Found> {
    doc.elements()
        .filter_map(|el| {
            let inline = |relation_type, asset_type| {
                Some(Found {
                    relation_type,
                    binding: Binding::Inline(el.id()),
                    target: FoundTarget::Inline(asset_type, doc.raw_text(el.id()).unwrap_or_default().to_owned()),
                })
            };
            let (relation_type, attr) = match el.name() {
                "a" => (RelationType::HtmlAnchor, "href"),
                "img" => (RelationType::HtmlImage, "src"),
                "script" if !el.has_attr("src") => {
                    return is_javascript_type(el)
                        .then(|| inline(RelationType::HtmlScript, AssetType::JavaScript))
                        .flatten();
                }
                "script" => (RelationType::HtmlScript, "src"),
                "style" => return inline(RelationType::HtmlStyle, AssetType::Css),
                "link" if el.attr_contains_token("rel", "stylesheet") => {
                    (RelationType::HtmlStyle, "href")
                }
                _ => return None,
            };
            let href = el.attr(attr)?.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            Some(Found {
                relation_type,
                binding: Binding::Element(el.id()),
                target: FoundTarget::Href(href.to_owned()),
            })
        })
        .collect()
}

fn discover_css(sheet: &Stylesheet) -> Vec<Found> {
    let imports = sheet
        .imports()
        .iter()
        .filter(|import| !import.href.is_empty())
        .map(|import| Found {
            relation_type: RelationType::CssImport,
            binding: Binding::Import(import.id()),
            target: FoundTarget::Href(import.href.clone()),
        });
    let urls = sheet
        .urls()
        .iter()
        .filter(|url| !url.href.is_empty())
        .map(|url| Found {
            relation_type: if url.property.as_deref() == Some("behavior") {
                RelationType::CssBehavior
            } else {
                RelationType::CssImage
            },
            binding: Binding::Url(url.id()),
            target: FoundTarget::Href(url.href.clone()),
        });
    imports.chain(urls).collect()
}

// =============================================================================
// Read / write
// =============================================================================

/// Current href of a bound relation; `None` if its node is gone or holds
/// the target inline.
pub(crate) fn read(tree: &ParseTree, relation_type: RelationType, binding: Binding) -> Option<String> {
    match (tree, binding) {
        (ParseTree::Html(doc), Binding::Element(node)) => {
            let (_, attr) = relation_type.element_attr()?;
            doc.element(node)?.attr(attr).map(str::to_owned)
        }
        (ParseTree::Css(sheet), Binding::Import(id)) => sheet.import(id).map(|i| i.href.clone()),
        (ParseTree::Css(sheet), Binding::Url(id)) => sheet.url(id).map(|u| u.href.clone()),
        _ => None,
    }
}

/// Write `href` through `binding`. Returns `false` if the node is gone or
/// has no href.
pub(crate) fn write(
    tree: &mut ParseTree,
    relation_type: RelationType,
    binding: Binding,
    href: &str,
) -> bool {
    match (tree, binding) {
        (ParseTree::Html(doc), Binding::Element(node)) => {
            let Some((_, attr)) = relation_type.element_attr() else {
                return false;
            };
            match doc.element_mut(node) {
                Some(el) => {
                    el.set_attr(attr, href);
                    true
                }
                None => false,
            }
        }
        (ParseTree::Css(sheet), Binding::Import(id)) => sheet.set_import_href(id, href),
        (ParseTree::Css(sheet), Binding::Url(id)) => sheet.set_url_href(id, href),
        _ => false,
    }
}

/// Replace the content of an inline node.
pub(crate) fn write_content(tree: &mut ParseTree, binding: Binding, text: &str) -> bool {
    match (tree, binding) {
        (ParseTree::Html(doc), Binding::Inline(node)) => doc.set_raw_text(node, text),
        _ => false,
    }
}

/// Media query attached to the relation's node, if any.
pub(crate) fn media(tree: &ParseTree, binding: Binding) -> Option<String> {
    match (tree, binding) {
        (ParseTree::Html(doc), Binding::Element(node) | Binding::Inline(node)) => {
            doc.element(node)?.attr("media").map(str::to_owned)
        }
        (ParseTree::Css(sheet), Binding::Import(id)) => sheet
            .import(id)
            .map(|i| i.media.clone())
            .filter(|media| !media.is_empty()),
        _ => None,
    }
}

// =============================================================================
// Node creation & removal
// =============================================================================

/// Whether a node for `relation_type` can be created in `tree`.
pub(crate) fn check_bindable(tree: &ParseTree, relation_type: RelationType) -> Result<()> {
    let ok = match (tree, relation_type) {
        (ParseTree::Html(_), t) => t.element_attr().is_some(),
        (ParseTree::Css(_), RelationType::CssImport) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(GraphError::Attach(format!(
            "cannot create a {relation_type} node; attach an already bound relation instead"
        )))
    }
}

/// Create the node for a new relation at `placement`.
///
/// With `content`, `HtmlStyle` and `HtmlScript` get a `<style>` / `<script>`
/// element holding it instead of an href.
pub(crate) fn bind(
    tree: &mut ParseTree,
    relation_type: RelationType,
    href: &str,
    media: Option<&str>,
    content: Option<&str>,
    placement: Placement,
) -> Result<Binding> {
    check_bindable(tree, relation_type)?;
    match tree {
        ParseTree::Html(doc) => {
            let Some((name, attr)) = relation_type.element_attr() else {
                return Err(GraphError::Attach(format!("{relation_type} has no element")));
            };
            let inline = match (relation_type, content) {
                (RelationType::HtmlStyle, Some(_)) => Some("style"),
                (RelationType::HtmlScript, Some(_)) => Some("script"),
                _ => None,
            };

            let mut attrs: Vec<(&str, &str)> = Vec::with_capacity(3);
            if inline.is_none() {
                if relation_type == RelationType::HtmlStyle {
                    attrs.push(("rel", "stylesheet"));
                }
                attrs.push((attr, href));
            }
            if let Some(media) = media {
                attrs.push(("media", media));
            }
            let element = doc.create_element(inline.unwrap_or(name), &attrs);
            let node = element.id();
            let container = if relation_type == RelationType::HtmlStyle {
                "head"
            } else {
                "body"
            };
            let placed = match placement {
                Placement::First => {
                    doc.prepend_to(container, element);
                    true
                }
                Placement::Last => {
                    doc.append_to(container, element);
                    true
                }
                Placement::Before(Binding::Element(adj) | Binding::Inline(adj)) => {
                    doc.insert_before(adj, element)
                }
                Placement::After(Binding::Element(adj) | Binding::Inline(adj)) => {
                    doc.insert_after(adj, element)
                }
                Placement::Before(_) | Placement::After(_) => {
                    return Err(GraphError::Attach("adjacent relation is not an element".into()));
                }
            };
            if !placed {
                return Err(GraphError::Attach("adjacent element is gone".into()));
            }

            match (inline, content) {
                (Some(_), Some(text)) => {
                    doc.set_raw_text(node, text);
                    Ok(Binding::Inline(node))
                }
                _ => Ok(Binding::Element(node)),
            }
        }
        ParseTree::Css(sheet) => {
            let index = match placement {
                Placement::First => 0,
                Placement::Last => sheet.imports().len(),
                Placement::Before(Binding::Import(adj)) => sheet
                    .import_index(adj)
                    .ok_or_else(|| GraphError::Attach("adjacent rule is gone".into()))?,
                Placement::After(Binding::Import(adj)) => {
                    sheet
                        .import_index(adj)
                        .ok_or_else(|| GraphError::Attach("adjacent rule is gone".into()))?
                        + 1
                }
                Placement::Before(_) | Placement::After(_) => {
                    return Err(GraphError::Attach("adjacent relation is not a rule".into()));
                }
            };
            sheet
                .insert_import(index, href, media.unwrap_or_default())
                .map(Binding::Import)
                .ok_or_else(|| GraphError::Attach(format!("cannot write an @import for `{href}`")))
        }
        _ => Err(GraphError::Attach(format!(
            "cannot create a {relation_type} node"
        ))),
    }
}

/// Remove the node behind `binding`.
///
/// A `url()` goes on its own; other urls of the same declaration stay bound.
pub(crate) fn unbind(tree: &mut ParseTree, binding: Binding) {
    match (tree, binding) {
        (ParseTree::Html(doc), Binding::Element(node) | Binding::Inline(node)) => {
            doc.remove_element(node);
        }
        (ParseTree::Css(sheet), Binding::Import(id)) => {
            sheet.remove_import(id);
        }
        (ParseTree::Css(sheet), Binding::Url(id)) => {
            sheet.remove_url(id);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(src: &str) -> ParseTree {
        ParseTree::Html(HtmlDocument::parse(src).unwrap())
    }

    fn css(src: &str) -> ParseTree {
        ParseTree::Css(Stylesheet::parse(src).unwrap())
    }

    fn summary(tree: &ParseTree) -> Vec<(RelationType, String)> {
        discover(tree)
            .into_iter()
            .map(|f| match f.target {
                FoundTarget::Href(href) => (f.relation_type, href),
                FoundTarget::Inline(asset_type, text) => (f.relation_type, format!("{asset_type}:{text}")),
            })
            .collect()
    }

    #[test]
    fn test_discover_html() {
        let tree = html(
            "<link rel=stylesheet href=a.css><link rel=icon href=f.ico><style>p{}</style><a href=#top>t</a><a href=b.html>b</a><img src=c.png><script src=d.js></script><script>inline()</script><script type=text/template><b></script>",
        );
        assert_eq!(
            summary(&tree),
            vec![
                (RelationType::HtmlStyle, "a.css".to_string()),
                (RelationType::HtmlStyle, "Css:p{}".to_string()),
                (RelationType::HtmlAnchor, "b.html".to_string()),
                (RelationType::HtmlImage, "c.png".to_string()),
                (RelationType::HtmlScript, "d.js".to_string()),
                (RelationType::HtmlScript, "JavaScript:inline()".to_string()),
            ]
        );
    }

    #[test]
    fn test_discover_css() {
        let tree = css(
            "@import 'x.css' print;\n.a { background: url(a.png), url(\"b c.png\") }\n.b { behavior: url(fix.htc) }",
        );
        assert_eq!(
            summary(&tree),
            vec![
                (RelationType::CssImport, "x.css".to_string()),
                (RelationType::CssImage, "a.png".to_string()),
                (RelationType::CssImage, "b c.png".to_string()),
                (RelationType::CssBehavior, "fix.htc".to_string()),
            ]
        );
    }

    #[test]
    fn test_discover_css_in_at_rules() {
        let tree = css("@font-face{src:url(f.woff)} @media print{.a{background:url(p.png)}}");
        assert_eq!(
            summary(&tree),
            vec![
                (RelationType::CssImage, "f.woff".to_string()),
                (RelationType::CssImage, "p.png".to_string()),
            ]
        );
    }

    #[test]
    fn test_write_css_url_quotes_when_needed() {
        let mut tree = css(".a { background-image: url(a.png) }");
        let binding = discover(&tree)[0].binding;
        assert!(write(&mut tree, RelationType::CssImage, binding, "foo bar.png"));
        assert_eq!(
            read(&tree, RelationType::CssImage, binding).as_deref(),
            Some("foo bar.png")
        );
        assert_eq!(tree.serialize(false), ".a{background-image:url('foo bar.png')}");

        assert!(write(&mut tree, RelationType::CssImage, binding, "foo.png"));
        assert_eq!(tree.serialize(false), ".a{background-image:url(foo.png)}");
    }

    #[test]
    fn test_unbind_url_keeps_sibling_in_declaration() {
        let mut tree = css(".a { background: url(a.png), url(b.png) }");
        let found = discover(&tree);
        let (first, second) = (found[0].binding, found[1].binding);

        unbind(&mut tree, first);
        assert_eq!(read(&tree, RelationType::CssImage, first), None);
        assert_eq!(
            read(&tree, RelationType::CssImage, second).as_deref(),
            Some("b.png")
        );
        let out = tree.serialize(false);
        assert!(out.contains("b.png") && !out.contains("a.png"), "{out}");

        assert!(write(&mut tree, RelationType::CssImage, second, "c.png"));
        assert!(tree.serialize(false).contains("url(c.png)"));
    }

    #[test]
    fn test_bind_and_unbind_html() {
        let mut tree = html("<html><head></head><body><script src=a.js></script></body></html>");
        let adj = discover(&tree)[0].binding;
        let binding = bind(
            &mut tree,
            RelationType::HtmlScript,
            "b.js",
            None,
            None,
            Placement::Before(adj),
        )
        .unwrap();
        assert_eq!(
            tree.serialize(false),
            "<html><head></head><body><script src=\"b.js\"></script><script src=a.js></script></body></html>"
        );
        unbind(&mut tree, binding);
        assert_eq!(
            tree.serialize(false),
            "<html><head></head><body><script src=a.js></script></body></html>"
        );
    }

    #[test]
    fn test_bind_inline_content() {
        let mut tree = html("<html><head><title>t</title></head><body></body></html>");
        let style = bind(
            &mut tree,
            RelationType::HtmlStyle,
            "",
            Some("print"),
            Some("body{color:red}"),
            Placement::Last,
        )
        .unwrap();
        assert!(matches!(style, Binding::Inline(_)));
        assert_eq!(read(&tree, RelationType::HtmlStyle, style), None);
        assert_eq!(media(&tree, style).as_deref(), Some("print"));
        assert_eq!(
            tree.serialize(false),
            "<html><head><title>t</title><style media=\"print\">body{color:red}</style></head><body></body></html>"
        );

        assert!(write_content(&mut tree, style, "p{}"));
        assert!(tree.serialize(false).contains("<style media=\"print\">p{}</style>"));

        let script = bind(
            &mut tree,
            RelationType::HtmlScript,
            "",
            None,
            Some("go()"),
            Placement::First,
        )
        .unwrap();
        assert!(tree.serialize(false).contains("<body><script>go()</script></body>"));
        unbind(&mut tree, script);
        assert!(!tree.serialize(false).contains("go()"));
    }

    #[test]
    fn test_bind_css_image_is_rejected() {
        let mut tree = css("a{b:c}");
        assert!(matches!(
            bind(&mut tree, RelationType::CssImage, "x.png", None, None, Placement::Last),
            Err(GraphError::Attach(_))
        ));
        let binding = bind(
            &mut tree,
            RelationType::CssImport,
            "x.css",
            Some("print"),
            None,
            Placement::Last,
        )
        .unwrap();
        assert_eq!(media(&tree, binding).as_deref(), Some("print"));
        assert_eq!(tree.serialize(false), "@import url(x.css) print;a{b:c}");
    }
}
