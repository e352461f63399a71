//! Process-unique identifiers.
//!
//! Assets, relations and graphs draw from one shared counter, so an id is
//! unique across entity kinds for the lifetime of the process. Allocation is a
//! single atomic increment and never depends on the order in which entities
//! are registered anywhere.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Allocate a fresh id.
            #[inline]
            pub(crate) fn next() -> Self {
                Self(next_id())
            }

            /// Raw numeric value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identity of an [`Asset`](crate::asset::Asset).
    AssetId
);
define_id!(
    /// Identity of a [`Relation`](crate::relation::Relation).
    RelationId
);
define_id!(
    /// Identity of an [`AssetGraph`](crate::graph::AssetGraph).
    GraphId
);
