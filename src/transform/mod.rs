//! Graph transforms and the pipeline that sequences them.
//!
//! A transform is one graph-rewriting pass. Transforms run strictly in
//! order; each settles completely (including all of its loads) before the
//! next one starts.
//!
//! ```ignore
//! Pipeline::new()
//!     .pipe(LoadAssets::new(loader.clone(), ["index.html"]))
//!     .pipe(Populate::new(loader))
//!     .pipe(ConvertCssImportsToHtmlStyles::new(AssetQuery::new()))
//!     .run(&mut graph)
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - `loader`: byte loading collaborators (`FsLoader`, `MemoryLoader`)
//! - `load`: two-phase input loading
//! - `populate`: follow relations from the initial assets
//! - `move_assets`: change urls and refresh incoming hrefs
//! - `css_imports`: hoist `@import`s into `<link rel=stylesheet>`
//! - `html_styles`: fold `<link rel=stylesheet>`s into inline `@import`s
//! - `encoding`: re-encode assets
//! - `print`: pretty-print / minify
//! - `dump`: log the whole graph

mod css_imports;
mod dump;
mod encoding;
mod html_styles;
mod load;
pub mod loader;
mod move_assets;
mod populate;
mod print;

use async_trait::async_trait;

pub use css_imports::ConvertCssImportsToHtmlStyles;
pub use dump::DumpGraph;
pub use encoding::SetAssetEncoding;
pub use html_styles::ConvertHtmlStylesToInlineCssImports;
pub use load::LoadAssets;
pub use loader::{AssetLoader, FsLoader, MemoryLoader};
pub use move_assets::{MoveAssets, NewUrl};
pub use populate::Populate;
pub use print::{MinifyAssets, PrettyPrintAssets};

use crate::debug;
use crate::error::Result;
use crate::graph::AssetGraph;

/// A graph-rewriting pass.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()>;
}

/// Ordered list of transforms.
#[derive(Default)]
pub struct Pipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipe(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run every transform in order, stopping at the first failure.
    pub async fn run(&self, graph: &mut AssetGraph) -> Result<()> {
        for transform in &self.transforms {
            debug!("pipeline"; "{} ({} assets)", transform.name(), graph.len());
            transform.apply(graph).await?;
            graph.sync_inline();
        }
        debug!("pipeline"; "done ({} assets)", graph.len());
        Ok(())
    }
}
