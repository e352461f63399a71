//! Re-encode assets.

use async_trait::async_trait;

use super::Transform;
use crate::debug;
use crate::error::Result;
use crate::graph::{AssetGraph, AssetQuery};
use crate::syntax::Encoding;

/// Change the encoding of every matching text asset. Html and Css assets
/// also get their charset declaration rewritten (or inserted).
pub struct SetAssetEncoding {
    query: AssetQuery,
    encoding: Encoding,
}

impl SetAssetEncoding {
    pub fn new(query: AssetQuery, encoding: Encoding) -> Self {
        Self { query, encoding }
    }
}

#[async_trait]
impl Transform for SetAssetEncoding {
    fn name(&self) -> &'static str {
        "setAssetEncoding"
    }

    async fn apply(&self, graph: &mut AssetGraph) -> Result<()> {
        for id in graph.find_assets(&self.query) {
            let Some(asset) = graph.asset_mut(id) else {
                continue;
            };
            if !asset.asset_type().is_text() || asset.encoding() == self.encoding {
                continue;
            }
            debug!("encoding"; "{} {} -> {}", asset, asset.encoding(), self.encoding);
            asset.set_encoding(self.encoding)?;
        }
        Ok(())
    }
}
