//! Attribute-predicate queries over assets and relations.
//!
//! Every attribute of a query is matched by a [`Matcher`]: a literal value,
//! a set of acceptable values (OR), or a custom function. Unset attributes
//! match everything.
//!
//! ```ignore
//! let styles = RelationQuery::new()
//!     .relation_type(vec![RelationType::HtmlStyle, RelationType::CssImport])
//!     .from(AssetQuery::new().asset_type(AssetType::Html));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::asset::{Asset, AssetType};
use crate::core::{AssetId, RelationId, UrlMatcher};
use crate::relation::{Relation, RelationType, Target};

use super::AssetGraph;

type Predicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Matches a single attribute value.
pub enum Matcher<V> {
    Is(V),
    AnyOf(Vec<V>),
    Test(Predicate<V>),
}

impl<V: PartialEq> Matcher<V> {
    /// Match with an arbitrary function.
    pub fn test<F>(f: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self::Test(Arc::new(f))
    }

    pub fn matches(&self, value: &V) -> bool {
        match self {
            Self::Is(v) => v == value,
            Self::AnyOf(values) => values.contains(value),
            Self::Test(f) => f(value),
        }
    }
}

impl<V: Clone> Clone for Matcher<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Is(v) => Self::Is(v.clone()),
            Self::AnyOf(values) => Self::AnyOf(values.clone()),
            Self::Test(f) => Self::Test(Arc::clone(f)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Matcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Is(v) => f.debug_tuple("Is").field(v).finish(),
            Self::AnyOf(values) => f.debug_tuple("AnyOf").field(values).finish(),
            Self::Test(_) => f.write_str("Test(..)"),
        }
    }
}

impl<V> From<V> for Matcher<V> {
    fn from(value: V) -> Self {
        Self::Is(value)
    }
}

impl<V> From<Vec<V>> for Matcher<V> {
    fn from(values: Vec<V>) -> Self {
        Self::AnyOf(values)
    }
}

impl From<&str> for Matcher<String> {
    fn from(value: &str) -> Self {
        Self::Is(value.to_owned())
    }
}

impl From<Vec<&str>> for Matcher<String> {
    fn from(values: Vec<&str>) -> Self {
        Self::AnyOf(values.into_iter().map(str::to_owned).collect())
    }
}

fn check<V: PartialEq>(matcher: &Option<Matcher<V>>, value: &V) -> bool {
    matcher.as_ref().is_none_or(|m| m.matches(value))
}

fn check_flag(expected: Option<bool>, actual: bool) -> bool {
    expected.is_none_or(|e| e == actual)
}

// =============================================================================
// AssetQuery
// =============================================================================

/// Predicate over assets.
#[derive(Clone, Default)]
pub struct AssetQuery {
    id: Option<Matcher<AssetId>>,
    asset_type: Option<Matcher<AssetType>>,
    url: Option<Matcher<String>>,
    url_matching: Option<UrlMatcher>,
    inline: Option<bool>,
    initial: Option<bool>,
    dirty: Option<bool>,
    loaded: Option<bool>,
    custom: Option<Arc<dyn Fn(&Asset) -> bool + Send + Sync>>,
}

impl AssetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<Matcher<AssetId>>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn asset_type(mut self, asset_type: impl Into<Matcher<AssetType>>) -> Self {
        self.asset_type = Some(asset_type.into());
        self
    }

    /// Match the url. Inline assets never match.
    pub fn url(mut self, url: impl Into<Matcher<String>>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Match file urls against glob patterns.
    pub fn url_matching(mut self, matcher: UrlMatcher) -> Self {
        self.url_matching = Some(matcher);
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = Some(inline);
        self
    }

    pub fn initial(mut self, initial: bool) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }

    pub fn loaded(mut self, loaded: bool) -> Self {
        self.loaded = Some(loaded);
        self
    }

    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: Fn(&Asset) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(f));
        self
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        let url_ok = match (&self.url, asset.url()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(m), Some(url)) => m.matches(&url.to_owned()),
        };
        let glob_ok = match (&self.url_matching, asset.url()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(m), Some(url)) => m.matches(url),
        };
        url_ok
            && glob_ok
            && check(&self.id, &asset.id())
            && check(&self.asset_type, &asset.asset_type())
            && check_flag(self.inline, asset.is_inline())
            && check_flag(self.initial, asset.is_initial())
            && check_flag(self.dirty, asset.is_dirty())
            && check_flag(self.loaded, asset.is_loaded())
            && self.custom.as_ref().is_none_or(|f| f(asset))
    }
}

impl fmt::Debug for AssetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetQuery")
            .field("id", &self.id)
            .field("asset_type", &self.asset_type)
            .field("url", &self.url)
            .field("inline", &self.inline)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RelationQuery
// =============================================================================

/// Selects the asset at one end of a relation.
#[derive(Debug, Clone)]
pub enum AssetSelector {
    Id(Matcher<AssetId>),
    Query(AssetQuery),
}

impl AssetSelector {
    fn matches(&self, graph: &AssetGraph, id: AssetId) -> bool {
        match self {
            Self::Id(m) => m.matches(&id),
            Self::Query(q) => graph.asset(id).is_some_and(|a| q.matches(a)),
        }
    }
}

impl From<AssetId> for AssetSelector {
    fn from(id: AssetId) -> Self {
        Self::Id(Matcher::Is(id))
    }
}

impl From<Vec<AssetId>> for AssetSelector {
    fn from(ids: Vec<AssetId>) -> Self {
        Self::Id(Matcher::AnyOf(ids))
    }
}

impl From<AssetQuery> for AssetSelector {
    fn from(query: AssetQuery) -> Self {
        Self::Query(query)
    }
}

/// Predicate over relations.
#[derive(Clone, Default)]
pub struct RelationQuery {
    id: Option<Matcher<RelationId>>,
    relation_type: Option<Matcher<RelationType>>,
    from: Option<AssetSelector>,
    to: Option<AssetSelector>,
    to_url: Option<Matcher<String>>,
    custom: Option<Arc<dyn Fn(&Relation) -> bool + Send + Sync>>,
}

impl RelationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<Matcher<RelationId>>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn relation_type(mut self, relation_type: impl Into<Matcher<RelationType>>) -> Self {
        self.relation_type = Some(relation_type.into());
        self
    }

    pub fn from(mut self, from: impl Into<AssetSelector>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Match the target asset. Unpopulated relations never match.
    pub fn to(mut self, to: impl Into<AssetSelector>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Match the target url, populated or not.
    pub fn to_url(mut self, url: impl Into<Matcher<String>>) -> Self {
        self.to_url = Some(url.into());
        self
    }

    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: Fn(&Relation) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(f));
        self
    }

    pub fn matches(&self, graph: &AssetGraph, relation: &Relation) -> bool {
        if !check(&self.id, &relation.id()) || !check(&self.relation_type, &relation.relation_type()) {
            return false;
        }
        if let Some(from) = &self.from
            && !relation.from().is_some_and(|id| from.matches(graph, id))
        {
            return false;
        }
        if let Some(to) = &self.to
            && !relation.target().is_some_and(|id| to.matches(graph, id))
        {
            return false;
        }
        if let Some(m) = &self.to_url {
            let url = match relation.to() {
                Target::Asset(id) => graph.asset(*id).and_then(Asset::url).map(str::to_owned),
                Target::Pending(asset) => asset.url().map(str::to_owned),
                Target::Unresolved(config) => config.url.clone(),
            };
            if !url.is_some_and(|url| m.matches(&url)) {
                return false;
            }
        }
        self.custom.as_ref().is_none_or(|f| f(relation))
    }
}

impl fmt::Debug for RelationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationQuery")
            .field("id", &self.id)
            .field("relation_type", &self.relation_type)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("to_url", &self.to_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetConfig;

    fn css(url: &str) -> Asset {
        Asset::from_config(AssetConfig::from(url).with_text("a{b:c}").initial(true)).unwrap()
    }

    #[test]
    fn test_matcher_kinds() {
        let is: Matcher<AssetType> = AssetType::Css.into();
        assert!(is.matches(&AssetType::Css));
        assert!(!is.matches(&AssetType::Html));

        let any: Matcher<AssetType> = vec![AssetType::Html, AssetType::Xhtml].into();
        assert!(any.matches(&AssetType::Xhtml));

        let test = Matcher::test(|t: &AssetType| t.is_text());
        assert!(test.matches(&AssetType::Json));
        assert!(!test.matches(&AssetType::Png));
    }

    #[test]
    fn test_asset_query() {
        let asset = css("file:///site/a.css");
        assert!(AssetQuery::new().matches(&asset));
        assert!(AssetQuery::new().asset_type(AssetType::Css).initial(true).matches(&asset));
        assert!(!AssetQuery::new().dirty(true).matches(&asset));
        assert!(AssetQuery::new().url("file:///site/a.css").matches(&asset));
        assert!(AssetQuery::new().url(vec!["file:///x", "file:///site/a.css"]).matches(&asset));
        assert!(
            AssetQuery::new()
                .url(Matcher::test(|u: &String| u.ends_with(".css")))
                .matches(&asset)
        );
        assert!(!AssetQuery::new().inline(true).matches(&asset));

        let inline = Asset::new(AssetType::Css, None);
        assert!(!AssetQuery::new().url(Matcher::test(|_: &String| true)).matches(&inline));
        assert!(AssetQuery::new().custom(|a| a.is_inline()).matches(&inline));
    }

    #[test]
    fn test_url_matching() {
        let matcher = UrlMatcher::new(["/site/**/*.css"]).unwrap();
        let query = AssetQuery::new().url_matching(matcher);
        assert!(query.matches(&css("file:///site/deep/a.css")));
        assert!(!query.matches(&css("http://site/a.css")));
    }
}
