//! Format adapters: per-format parsers that turn resource files into
//! canonical entities and hierarchy edges.

mod delimited;
mod framenet;
mod ontonotes;
mod propbank;
mod reference;
mod registry;
mod semnet;
mod traits;
mod verbnet;
mod wordnet;
pub mod xml;

pub use delimited::{
    parse_list_cell, parse_table, sniff_delimiter, split_row, CategoryMappingAdapter,
    DelimitedTable,
};
pub use framenet::{FrameInventoryAdapter, INHERITANCE};
pub use ontonotes::SenseInventoryAdapter;
pub use propbank::PredicateBankAdapter;
pub use reference::{ReferenceCategory, ReferenceDocAdapter};
pub use registry::{default_adapter, AdapterRegistry};
pub use semnet::SemanticNetworkAdapter;
pub use traits::{read_text, AdapterOutput, FormatAdapter, ParseTask, TaskOutput};
pub use verbnet::{class_number, ClassHierarchyAdapter};
pub use wordnet::SynsetNetworkAdapter;
