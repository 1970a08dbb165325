//! Shared vocabularies (roles, predicates, restrictions, features) collected
//! from entity annotations across every resource.

mod builder;

pub use builder::{CollectionWarning, ReferenceCollection, ReferenceCollectionEntry};
