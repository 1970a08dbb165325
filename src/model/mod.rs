//! Canonical data model shared by every resource.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  XML / text  │──▶│   Entity     │──▶│  Canonical   │
//! │  CSV / JSON  │   │ + edges      │   │    Store     │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```

mod types;

pub use types::*;
