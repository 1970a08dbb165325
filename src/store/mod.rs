//! Canonical in-memory store for parsed entities.
//!
//! Entities are kept per resource kind in insertion order, with an id index,
//! an alias index and a flat parent/children index folded from the
//! hierarchy edges the adapters emit.

mod canonical;

pub use canonical::{CanonicalStore, StoreWarning};
