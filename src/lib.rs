//! assetgraph - a typed, mutable graph of interlinked web assets.
//!
//! Assets (Html, Css, JavaScript, Json, images, ...) are nodes; relations
//! (`<link>`, `<img>`, `@import`, `url()`, ...) are typed, ordered edges owned
//! by their source asset. Every asset keeps its raw bytes, decoded text and
//! parse tree lazily in sync, and editing a relation's href writes straight
//! through to the source asset's parse tree.
//!
//! # Module Structure
//!
//! ```text
//! assetgraph/
//! ├── core/        # ids, urls, globs, event channel
//! ├── error        # GraphError, ParseFailure
//! ├── syntax/      # Html / Css / JavaScript structured forms, encodings
//! ├── asset/       # Asset, AssetType, AssetConfig
//! ├── relation/    # Relation, RelationType, href bindings
//! ├── graph/       # AssetGraph, queries, traversal, population
//! ├── transform/   # loaders, Transform, Pipeline and the stock transforms
//! └── logger       # log! / debug! macros
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut graph = AssetGraph::from_dir(Path::new("public"));
//! let loader: Arc<dyn AssetLoader> = Arc::new(FsLoader);
//! Pipeline::new()
//!     .pipe(LoadAssets::new(loader.clone(), ["index.html"]))
//!     .pipe(Populate::new(loader))
//!     .pipe(MoveAssets::new(AssetQuery::new().asset_type(AssetType::Css), "/static/"))
//!     .run(&mut graph)
//!     .await?;
//! ```

pub mod logger;

pub mod asset;
pub mod core;
pub mod error;
pub mod graph;
pub mod relation;
pub mod syntax;
pub mod transform;

pub use asset::{Asset, AssetConfig, AssetType};
pub use error::{GraphError, Result};
pub use graph::AssetGraph;
pub use relation::{Position, Relation, RelationType};
