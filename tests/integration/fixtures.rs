//! Corpus fixtures written to temporary directories.

use std::fs;
use std::path::Path;

use lexicon_bridge::{Config, KnowledgeBase};
use tempfile::TempDir;

pub const GIVE_CLASS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VNCLASS ID="give-13.1">
  <MEMBERS>
    <MEMBER name="give" wn="give%2:40:00" grouping="give.01" fn_mapping="Giving"/>
  </MEMBERS>
  <THEMROLES>
    <THEMROLE type="Agent"><SELRESTRS/></THEMROLE>
    <THEMROLE type="Recipient"><SELRESTRS/></THEMROLE>
  </THEMROLES>
  <FRAMES/>
  <SUBCLASSES>
    <VNSUBCLASS ID="give-13.1-1">
      <MEMBERS><MEMBER name="feed" wn="" grouping="" fn_mapping="None"/></MEMBERS>
      <THEMROLES/>
      <FRAMES/>
      <SUBCLASSES/>
    </VNSUBCLASS>
  </SUBCLASSES>
</VNCLASS>"#;

pub const GIVE_FRAMESET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<frameset>
  <predicate lemma="give">
    <roleset id="give.01" name="transfer" vncls="13.1">
      <roles>
        <role descr="giver" f="PAG" n="0"><vnrole vncls="13.1" vntheta="agent"/></role>
      </roles>
    </roleset>
    <roleset id="give.02" name="emit" vncls="99.9"/>
  </predicate>
</frameset>"#;

/// Minimal class file with the given members.
pub fn class_xml(id: &str, members: &[&str]) -> String {
    let members: String = members
        .iter()
        .map(|m| format!(r#"<MEMBER name="{m}"/>"#))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<VNCLASS ID="{id}"><MEMBERS>{members}</MEMBERS><THEMROLES/><FRAMES/><SUBCLASSES/></VNCLASS>"#
    )
}

/// Semantic network file with one singleton node per word.
pub fn semnet_json(words: &[&str]) -> String {
    let nodes: Vec<String> = words
        .iter()
        .map(|w| format!(r#""{w}": {{"word": "{w}"}}"#))
        .collect();
    format!(r#"{{"nodes": {{{}}}}}"#, nodes.join(", "))
}

pub fn write(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

/// Corpus with the give class hierarchy and a predicate bank that links
/// into it.
pub fn create_give_corpus() -> TempDir {
    let root = TempDir::new().unwrap();
    write(&root.path().join("verbnet"), "give-13.1.xml", GIVE_CLASS);
    write(&root.path().join("propbank"), "give.xml", GIVE_FRAMESET);
    root
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.load.max_concurrent_files = 4;
    config
}

pub fn create_knowledge_base() -> KnowledgeBase {
    KnowledgeBase::new(create_test_config()).unwrap()
}
