//! Corpus layout table: where each resource lives and which files belong to it.

use crate::model::ResourceKind;

/// Directory names, file globs and accepted root elements for one resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLayout {
    pub kind: ResourceKind,
    /// Directory names searched under a corpus root, in priority order.
    pub dir_aliases: &'static [&'static str],
    /// Globs matched against paths relative to the resource directory.
    pub include: &'static [&'static str],
    /// Globs that remove otherwise included files.
    pub exclude: &'static [&'static str],
    /// Root elements an XML file of this resource may open with.
    pub expected_roots: &'static [&'static str],
}

const CLASS_HIERARCHY: ResourceLayout = ResourceLayout {
    kind: ResourceKind::ClassHierarchy,
    dir_aliases: &["verbnet", "vn", "verbnet3.4", "vn_api", "verbnet_api"],
    include: &["*.xml", "**/*.xml"],
    exclude: &[],
    expected_roots: &["VNCLASS"],
};

const FRAME_INVENTORY: ResourceLayout = ResourceLayout {
    kind: ResourceKind::FrameInventory,
    dir_aliases: &["framenet", "fn", "framenet1.7"],
    include: &["frame/*.xml", "frRelation.xml"],
    exclude: &[],
    expected_roots: &["frame", "frameRelations"],
};

const PREDICATE_BANK: ResourceLayout = ResourceLayout {
    kind: ResourceKind::PredicateBank,
    dir_aliases: &["propbank", "pb", "propbank3.4"],
    include: &["*.xml", "frames/*.xml"],
    exclude: &[],
    expected_roots: &["frameset"],
};

const SENSE_INVENTORY: ResourceLayout = ResourceLayout {
    kind: ResourceKind::SenseInventory,
    dir_aliases: &["ontonotes", "on", "ontonotes5.0"],
    include: &["*.xml", "sense-inventories/*.xml", "**/sense-inventories/*.xml"],
    exclude: &[],
    expected_roots: &["inventory"],
};

const SYNSET_NETWORK: ResourceLayout = ResourceLayout {
    kind: ResourceKind::SynsetNetwork,
    dir_aliases: &["wordnet", "wn", "wordnet3.1"],
    include: &[
        "data.*",
        "index.*",
        "*.exc",
        "dict/data.*",
        "dict/index.*",
        "dict/*.exc",
    ],
    exclude: &["index.sense", "dict/index.sense"],
    expected_roots: &[],
};

const CATEGORY_MAPPING: ResourceLayout = ResourceLayout {
    kind: ResourceKind::CategoryMapping,
    dir_aliases: &["BSO", "bso", "basic_semantic_ontology"],
    include: &["*.csv", "*.tsv"],
    exclude: &[],
    expected_roots: &[],
};

const SEMANTIC_NETWORK: ResourceLayout = ResourceLayout {
    kind: ResourceKind::SemanticNetwork,
    dir_aliases: &["semnet20180205", "semnet", "semantic_network"],
    include: &["*.json"],
    exclude: &[],
    expected_roots: &[],
};

const REFERENCE_DOC: ResourceLayout = ResourceLayout {
    kind: ResourceKind::ReferenceDoc,
    dir_aliases: &["reference_docs", "ref_docs", "docs"],
    include: &["*.json", "*.tsv"],
    exclude: &[],
    expected_roots: &[],
};

/// Layout entry for one resource kind.
pub fn layout_for(kind: ResourceKind) -> &'static ResourceLayout {
    match kind {
        ResourceKind::ClassHierarchy => &CLASS_HIERARCHY,
        ResourceKind::FrameInventory => &FRAME_INVENTORY,
        ResourceKind::PredicateBank => &PREDICATE_BANK,
        ResourceKind::SenseInventory => &SENSE_INVENTORY,
        ResourceKind::SynsetNetwork => &SYNSET_NETWORK,
        ResourceKind::CategoryMapping => &CATEGORY_MAPPING,
        ResourceKind::SemanticNetwork => &SEMANTIC_NETWORK,
        ResourceKind::ReferenceDoc => &REFERENCE_DOC,
    }
}

/// The full layout table in `ResourceKind` declaration order.
pub fn corpus_layout() -> impl Iterator<Item = &'static ResourceLayout> {
    ResourceKind::ALL.into_iter().map(layout_for)
}
