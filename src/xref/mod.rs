//! Cross-reference index between entities of different resources.
//!
//! ```text
//!   extra["verbnet_classes"] = ["13.1"] ──resolve_alias──► Explicit (1.0)
//!   member_lexemes ∩ member_lexemes     ──inverted index──► Inferred (Jaccard)
//! ```

mod index;
mod types;

pub use index::CrossReferenceIndex;
pub use types::{CrossReference, LinkKind, MEMBER_LEXEMES};
