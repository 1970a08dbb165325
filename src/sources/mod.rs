//! Locating resource directories and the files inside them.

mod discovery;
mod layout;

pub use discovery::{collect_files, discover_resources, resource_dir, FileFilter};
pub use layout::{corpus_layout, layout_for, ResourceLayout};
