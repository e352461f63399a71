//! Core types - pure abstractions shared across the engine.

pub mod glob;
mod event;
mod id;
pub mod url;

pub use event::{EventKind, EventSink, GraphEvent};
pub use glob::{Glob, UrlMatcher};
pub use id::{AssetId, GraphId, RelationId};
