//! Integration tests for lexicon-bridge.
//!
//! These tests drive the full pipeline from corpus files on disk through
//! loading, cross-referencing and querying to snapshot export.
//!
//! Run with:
//! ```bash
//! cargo test --test integration
//! ```

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/test_loading.rs"]
mod test_loading;

#[path = "integration/test_queries.rs"]
mod test_queries;

#[path = "integration/test_snapshot.rs"]
mod test_snapshot;
