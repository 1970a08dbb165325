//! Synset network adapter (WordNet-style line-oriented database files).
//!
//! Each `data.{pos}` file is parsed together with its `index.{pos}` side
//! file: the index pass maps synset offsets to `(lemma, sense number)`, the
//! data pass turns fixed-field records into synset entities. `*.exc` files
//! contribute inflected-form exceptions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;
use tracing::debug;

use super::traits::{read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use crate::error::ParseError;
use crate::model::{Entity, ResourceKind};

const POS_FILES: [(&str, &str); 4] = [("noun", "n"), ("verb", "v"), ("adj", "a"), ("adv", "r")];

static RE_QUOTED: OnceLock<Regex> = OnceLock::new();

/// Offset to `(lemma, sense number)` pairs from one index file.
type SenseIndex = HashMap<String, Vec<(String, usize)>>;

#[derive(Debug, Default)]
pub struct SynsetNetworkAdapter;

impl SynsetNetworkAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
}

/// Single-letter part of speech for a `data.*`/`index.*` suffix.
fn pos_for_suffix(suffix: &str) -> Option<&'static str> {
    POS_FILES
        .iter()
        .find(|(name, _)| *name == suffix)
        .map(|(_, pos)| *pos)
}

/// Numeric synset type used in sense keys.
fn ss_type_number(ss_type: &str) -> Option<u8> {
    match ss_type {
        "n" => Some(1),
        "v" => Some(2),
        "a" => Some(3),
        "r" => Some(4),
        "s" => Some(5),
        _ => None,
    }
}

/// Header lines of the database files start with whitespace.
fn is_header(line: &str) -> bool {
    line.starts_with(' ') || line.trim().is_empty()
}

/// Word field without its adjective marker: `blue(a)` → `blue`.
fn strip_marker(word: &str) -> &str {
    match word.find('(') {
        Some(idx) if word.ends_with(')') => &word[..idx],
        _ => word,
    }
}

fn parse_index(content: &str, index: &mut SenseIndex, skipped: &mut usize) {
    for line in content.lines().filter(|l| !is_header(l)) {
        match parse_index_line(line) {
            Some((lemma, offsets)) => {
                for (i, offset) in offsets.into_iter().enumerate() {
                    index
                        .entry(offset.to_string())
                        .or_default()
                        .push((lemma.to_string(), i + 1));
                }
            }
            None => {
                debug!(line = %line, "Skipping malformed index line");
                *skipped += 1;
            }
        }
    }
}

/// `lemma pos synset_cnt p_cnt [ptr...] sense_cnt tagsense_cnt offset...`
fn parse_index_line(line: &str) -> Option<(&str, Vec<&str>)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let lemma = *parts.first()?;
    let synset_cnt: usize = parts.get(2)?.parse().ok()?;
    let p_cnt: usize = parts.get(3)?.parse().ok()?;
    let first_offset = 4 + p_cnt + 2;
    let offsets = parts.get(first_offset..first_offset + synset_cnt)?;
    if offsets.iter().any(|o| !o.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    Some((lemma, offsets.to_vec()))
}

/// Cursor over the whitespace-separated fields of a data record.
struct Fields<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn next(&mut self, what: &str) -> Result<&'a str, String> {
        self.inner
            .next()
            .ok_or_else(|| format!("record truncated before {what}"))
    }

    fn next_number(&mut self, what: &str, radix: u32) -> Result<usize, String> {
        let raw = self.next(what)?;
        usize::from_str_radix(raw, radix).map_err(|_| format!("invalid {what} '{raw}'"))
    }
}

/// One parsed data record, kept until satellite heads are resolved.
struct SynsetRecord {
    entity: Entity,
    words: Vec<(String, usize)>,
    lex_filenum: usize,
    /// Head synset id of an adjective satellite (`&` pointer).
    head: Option<String>,
}

impl SynsetRecord {
    /// Sense keys: `lemma%ss_type:lex_filenum:lex_id[:head_word:head_id]`.
    fn add_sense_keys(&mut self, head: Option<(&str, usize)>) {
        let Some(ss_number) = self.entity.pos.as_deref().and_then(ss_type_number) else {
            return;
        };
        for (word, lex_id) in &self.words {
            let key = format!(
                "{}%{}:{:02}:{:02}",
                word.to_lowercase(),
                ss_number,
                self.lex_filenum,
                lex_id
            );
            match head {
                Some((head_word, head_id)) => self
                    .entity
                    .add_alias(format!("{key}:{}:{:02}", head_word.to_lowercase(), head_id)),
                None => self.entity.add_alias(key),
            }
        }
    }
}

/// Give every record its sense keys; satellites take the first word of
/// their head synset.
fn resolve_sense_keys(mut records: Vec<SynsetRecord>) -> Vec<Entity> {
    let heads: HashMap<String, (String, usize)> = records
        .iter()
        .filter(|r| r.entity.pos.as_deref() == Some("a"))
        .filter_map(|r| Some((r.entity.id.clone(), r.words.first()?.clone())))
        .collect();

    for record in &mut records {
        let head = match &record.head {
            Some(head_id) => match heads.get(head_id) {
                Some((word, lex_id)) => Some((word.clone(), *lex_id)),
                None => {
                    debug!(synset = %record.entity.id, head = %head_id, "Satellite head not found");
                    None
                }
            },
            None => None,
        };
        record.add_sense_keys(head.as_ref().map(|(w, id)| (w.as_str(), *id)));
    }
    records.into_iter().map(|r| r.entity).collect()
}

fn parse_data_line(line: &str, index: &SenseIndex, source: &str) -> Result<SynsetRecord, String> {
    let (body, gloss) = match line.split_once('|') {
        Some((body, gloss)) => (body, gloss.trim()),
        None => (line, ""),
    };
    let mut fields = Fields {
        inner: body.split_whitespace(),
    };

    let offset = fields.next("offset")?;
    if offset.len() != 8 || !offset.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid synset offset '{offset}'"));
    }
    let lex_filenum = fields.next_number("lex_filenum", 10)?;
    let ss_type = fields.next("ss_type")?;
    if ss_type_number(ss_type).is_none() {
        return Err(format!("invalid synset type '{ss_type}'"));
    }

    let w_cnt = fields.next_number("w_cnt", 16)?;
    let mut words = Vec::with_capacity(w_cnt);
    for _ in 0..w_cnt {
        let word = strip_marker(fields.next("word")?);
        let lex_id = fields.next_number("lex_id", 16)?;
        words.push((word, lex_id));
    }
    if words.is_empty() {
        return Err("synset has no words".to_string());
    }

    let p_cnt = fields.next_number("p_cnt", 10)?;
    let mut pointers = Vec::with_capacity(p_cnt);
    let mut head = None;
    for _ in 0..p_cnt {
        let symbol = fields.next("pointer symbol")?;
        let target = fields.next("pointer offset")?;
        let target_pos = fields.next("pointer pos")?;
        let source_target = fields.next("pointer source/target")?;
        if ss_type == "s" && symbol == "&" && head.is_none() {
            head = Some(format!("{target}-{target_pos}"));
        }
        pointers.push(json!({
            "symbol": symbol,
            "target": format!("{target}-{target_pos}"),
            "source_target": source_target,
        }));
    }

    let mut verb_frames = Vec::new();
    if ss_type == "v" {
        if let Ok(f_cnt) = fields.next_number("f_cnt", 10) {
            for _ in 0..f_cnt {
                let _plus = fields.next("frame marker")?;
                let f_num = fields.next_number("frame number", 10)?;
                let _w_num = fields.next("frame word")?;
                if !verb_frames.contains(&f_num) {
                    verb_frames.push(f_num);
                }
            }
        }
    }

    let id = format!("{offset}-{ss_type}");
    let name = words[0].0.replace('_', " ");
    let mut entity = Entity::new(ResourceKind::SynsetNetwork, id, name)
        .with_pos(ss_type)
        .with_source_file(source)
        .with_members(words.iter().map(|(w, _)| w.replace('_', " ")));

    if let Some(senses) = index.get(offset) {
        let index_pos = if ss_type == "s" { "a" } else { ss_type };
        for (lemma, n) in senses {
            entity.add_alias(format!("{lemma}#{index_pos}#{n}"));
        }
    }

    let (definition, examples) = split_gloss(gloss);
    if let Some(definition) = definition {
        entity = entity.with_definition(definition);
    }
    entity = entity
        .with_extra("offset", json!(offset))
        .with_extra("lexfile", json!(lex_filenum));
    if !examples.is_empty() {
        entity = entity.with_extra("examples", json!(examples));
    }
    if !pointers.is_empty() {
        entity = entity.with_extra("pointers", serde_json::Value::Array(pointers));
    }
    if !verb_frames.is_empty() {
        entity = entity.with_extra("verb_frames", json!(verb_frames));
    }
    Ok(SynsetRecord {
        entity,
        words: words
            .into_iter()
            .map(|(word, lex_id)| (word.to_string(), lex_id))
            .collect(),
        lex_filenum,
        head,
    })
}

/// Split a gloss into its definition and quoted usage examples.
fn split_gloss(gloss: &str) -> (Option<String>, Vec<String>) {
    let re = RE_QUOTED.get_or_init(|| Regex::new(r#""([^"]*)""#).unwrap());
    let examples = re
        .captures_iter(gloss)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    let definition = gloss
        .split(';')
        .map(str::trim)
        .take_while(|part| !part.starts_with('"'))
        .collect::<Vec<_>>()
        .join("; ");
    let definition = (!definition.is_empty()).then_some(definition);
    (definition, examples)
}

/// `inflected base [base...]` lines.
fn parse_exceptions(content: &str, output: &mut TaskOutput) {
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(inflected) = parts.next() else {
            continue;
        };
        let mut any = false;
        for base in parts {
            output
                .exceptions
                .push((inflected.replace('_', " "), base.replace('_', " ")));
            any = true;
        }
        if !any {
            output.skipped_records += 1;
        }
    }
}

impl FormatAdapter for SynsetNetworkAdapter {
    fn name(&self) -> &'static str {
        "synset-network-text"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::SynsetNetwork
    }

    /// Pairs each data file with its index; exception files stand alone.
    fn plan(&self, files: &[PathBuf]) -> Vec<ParseTask> {
        let mut tasks = Vec::new();
        for path in files {
            let name = file_name(path);
            if name.ends_with(".exc") {
                tasks.push(ParseTask::single(path));
                continue;
            }
            let Some(suffix) = name.strip_prefix("data.") else {
                continue;
            };
            if pos_for_suffix(suffix).is_none() {
                debug!(file = %path.display(), "Ignoring unrecognized data file");
                continue;
            }
            let index_name = format!("index.{suffix}");
            let mut task = ParseTask::single(path);
            if let Some(index) = files
                .iter()
                .find(|f| file_name(f) == index_name && f.parent() == path.parent())
            {
                task = task.with_side(index);
            }
            tasks.push(task);
        }
        tasks
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let mut output = TaskOutput::default();
        let content = read_text(&task.primary)?;

        if file_name(&task.primary).ends_with(".exc") {
            parse_exceptions(&content, &mut output);
            return Ok(output);
        }

        let mut index = SenseIndex::new();
        for side in &task.side {
            let index_content = read_text(side)?;
            parse_index(&index_content, &mut index, &mut output.skipped_records);
        }

        let source = source_name(&task.primary);
        let mut records = 0usize;
        let mut parsed = Vec::new();
        for line in content.lines().filter(|l| !is_header(l)) {
            records += 1;
            match parse_data_line(line, &index, &source) {
                Ok(record) => parsed.push(record),
                Err(reason) => {
                    debug!(file = %source, reason = %reason, "Skipping malformed synset record");
                    output.skipped_records += 1;
                }
            }
        }
        output.entities = resolve_sense_keys(parsed);

        if records > 0 && output.entities.is_empty() {
            return Err(ParseError::Malformed(format!(
                "no readable synset records in {source}"
            )));
        }
        Ok(output)
    }
}
