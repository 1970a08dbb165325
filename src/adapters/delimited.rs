//! Delimited text tables and the category mapping adapter (BSO-style CSV).

use std::collections::{BTreeMap, HashMap};

use serde_json::json;
use tracing::debug;

use super::traits::{
    read_text, source_name, AdapterOutput, FormatAdapter, ParseTask, TaskOutput,
};
use crate::error::ParseError;
use crate::model::{Entity, ResourceKind, VERBNET_CLASSES};

const DELIMITERS: [char; 4] = ['\t', ',', ';', '|'];

/// A parsed table: header names and rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimitedTable {
    pub delimiter: char,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows dropped because their width did not match the header.
    pub skipped: usize,
}

impl DelimitedTable {
    /// Column index for the first header matching one of `names`, ignoring case.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| {
            self.headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
        })
    }
}

/// Pick the delimiter that occurs most often in the header line.
pub fn sniff_delimiter(header: &str) -> char {
    let mut best = (',', 0usize);
    for delimiter in DELIMITERS {
        let count = split_row(header, delimiter).len().saturating_sub(1);
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

/// Split one line, honoring double quotes (`""` escapes a quote) and
/// square-bracketed list literals.
pub fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut depth = 0usize;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ']' if !in_quotes && depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            c if c == delimiter && !in_quotes && depth == 0 => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Parse a bracketed list literal (`[a, b]`, `['a', 'b']`) or a plain
/// separated list into its items. Parenthetical notes are dropped.
pub fn parse_list_cell(cell: &str) -> Vec<String> {
    let cell = remove_parentheticals(cell);
    let cell = cell.trim();
    if let Some(inner) = cell.strip_prefix('[').and_then(|c| c.strip_suffix(']')) {
        return clean_items(inner.split(','));
    }
    match [',', ';'].into_iter().find(|s| cell.contains(*s)) {
        Some(sep) => clean_items(cell.split(sep)),
        None => clean_items(cell.split_whitespace()),
    }
}

fn clean_items<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items
        .map(|item| item.trim().trim_matches(|c: char| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `run (activity)` → `run `
fn remove_parentheticals(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Parse a whole delimited document. The first non-blank line is the header.
pub fn parse_table(content: &str) -> Result<DelimitedTable, ParseError> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| ParseError::Malformed("empty table".to_string()))?;
    let delimiter = sniff_delimiter(header);
    let headers = split_row(header, delimiter);

    let mut table = DelimitedTable {
        delimiter,
        headers,
        ..Default::default()
    };
    for line in lines {
        let mut row = split_row(line, delimiter);
        if row.len() < table.headers.len() {
            row.resize(table.headers.len(), String::new());
        }
        if row.len() != table.headers.len() {
            debug!(line = %line, "Skipping row with extra fields");
            table.skipped += 1;
            continue;
        }
        table.rows.push(row);
    }
    Ok(table)
}

const CATEGORY_COLUMNS: &[&str] = &["BSO_Category", "BSO", "Category", "bso_category"];
const CLASS_COLUMNS: &[&str] = &["VN_Class", "VerbNet_Class", "VNClass", "vn_class", "Class"];
const MEMBER_COLUMNS: &[&str] = &["Members", "Member", "members", "Verbs"];

/// Category mapping tables: one entity per category, listing the classes
/// mapped to it and their member verbs.
#[derive(Debug, Default)]
pub struct CategoryMappingAdapter;

impl CategoryMappingAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl FormatAdapter for CategoryMappingAdapter {
    fn name(&self) -> &'static str {
        "category-mapping-delimited"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::CategoryMapping
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let table = parse_table(&content)?;
        let category_col = table.column(CATEGORY_COLUMNS).ok_or_else(|| {
            ParseError::Malformed(format!(
                "no category column in header {:?}",
                table.headers
            ))
        })?;
        let class_col = table.column(CLASS_COLUMNS);
        let member_col = table.column(MEMBER_COLUMNS);
        let source = source_name(&task.primary);

        let mut output = TaskOutput {
            skipped_records: table.skipped,
            ..Default::default()
        };
        let mut order: Vec<String> = Vec::new();
        let mut by_category: BTreeMap<String, Entity> = BTreeMap::new();
        let mut class_members: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();

        for row in &table.rows {
            let category = row[category_col].trim();
            if category.is_empty() {
                output.skipped_records += 1;
                continue;
            }
            let entity = by_category.entry(category.to_string()).or_insert_with(|| {
                order.push(category.to_string());
                Entity::new(ResourceKind::CategoryMapping, category, category)
                    .with_source_file(&source)
            });

            let members = member_col
                .map(|col| parse_list_cell(&row[col]))
                .unwrap_or_default();
            for member in &members {
                entity.add_member(member.as_str());
            }
            if let Some(class) = class_col.map(|col| row[col].trim()).filter(|c| !c.is_empty()) {
                entity.push_reference(VERBNET_CLASSES, class);
                class_members
                    .entry(category.to_string())
                    .or_default()
                    .entry(class.to_string())
                    .or_default()
                    .extend(members);
            }
        }

        for category in order {
            if let Some(mut entity) = by_category.remove(&category) {
                if let Some(detail) = class_members.remove(&category) {
                    entity.extra.insert("class_members".to_string(), json!(detail));
                }
                output.entities.push(entity);
            }
        }
        Ok(output)
    }

    /// Both mapping directions describe the same categories, so records
    /// sharing an id are folded into the first one seen.
    fn finish(&self, output: &mut AdapterOutput) {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<Entity> = Vec::with_capacity(output.entities.len());
        for entity in output.entities.drain(..) {
            match positions.get(&entity.id) {
                Some(&pos) => {
                    debug!(category = %entity.id, "Merging category across mapping files");
                    merged[pos].merge(entity);
                }
                None => {
                    positions.insert(entity.id.clone(), merged.len());
                    merged.push(entity);
                }
            }
        }
        output.entities = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a\tb\tc"), '\t');
        assert_eq!(sniff_delimiter("a;b;c"), ';');
        assert_eq!(sniff_delimiter("a|b"), '|');
        assert_eq!(sniff_delimiter("single"), ',');
    }

    #[test]
    fn test_split_row_quotes_and_brackets() {
        let row = split_row(r#"Transfer,give-13.1,"[give, hand]",""quoted""#, ',');
        assert_eq!(row, vec!["Transfer", "give-13.1", "[give, hand]", "quoted"]);
        let row = split_row("a,[x, y],b", ',');
        assert_eq!(row, vec!["a", "[x, y]", "b"]);
    }

    #[test]
    fn test_parse_list_cell() {
        assert_eq!(parse_list_cell("['give', 'hand']"), vec!["give", "hand"]);
        assert_eq!(parse_list_cell("[give, hand]"), vec!["give", "hand"]);
        assert_eq!(parse_list_cell("give; hand"), vec!["give", "hand"]);
        assert_eq!(parse_list_cell("run (activity)"), vec!["run"]);
        assert!(parse_list_cell("[]").is_empty());
    }

    #[test]
    fn test_category_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BSOVNMapping_withMembers.csv");
        fs::write(
            &path,
            "BSO_Category,VN_Class,Members\n\
             Transfer,give-13.1,\"['give', 'lend']\"\n\
             Transfer,contribute-13.2,[donate]\n\
             Motion,run-51.3.2,[run]\n\
             ,orphan-1.1,[x]\n",
        )
        .unwrap();

        let output = CategoryMappingAdapter::new()
            .parse_task(&ParseTask::single(path))
            .unwrap();
        assert_eq!(output.entities.len(), 2);
        assert_eq!(output.skipped_records, 1);

        let transfer = &output.entities[0];
        assert_eq!(transfer.id, "Transfer");
        assert_eq!(transfer.member_lexemes, vec!["give", "lend", "donate"]);
        assert_eq!(
            transfer.references(VERBNET_CLASSES),
            vec!["give-13.1", "contribute-13.2"]
        );
        assert_eq!(output.entities[1].id, "Motion");
    }

    #[test]
    fn test_categories_merge_across_mapping_files() {
        let dir = TempDir::new().unwrap();
        let forward = dir.path().join("BSOVNMapping_withMembers.csv");
        fs::write(
            &forward,
            "BSO_Category,VN_Class,Members\nTransfer,give-13.1,\"[give, lend]\"\n",
        )
        .unwrap();
        let backward = dir.path().join("VNBSOMapping_withMembers.csv");
        fs::write(
            &backward,
            "VN_Class,BSO_Category,Members\ncontribute-13.2,Transfer,[donate]\nrun-51.3.2,Motion,[run]\n",
        )
        .unwrap();

        let output = CategoryMappingAdapter::new().parse(&[forward, backward]);
        assert_eq!(output.stats.succeeded, 2);
        let ids: Vec<_> = output.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Transfer", "Motion"]);

        let transfer = &output.entities[0];
        assert_eq!(transfer.member_lexemes, vec!["give", "lend", "donate"]);
        assert_eq!(
            transfer.references(VERBNET_CLASSES),
            vec!["give-13.1", "contribute-13.2"]
        );
        assert_eq!(transfer.extra["class_members"]["give-13.1"], json!(["give", "lend"]));
        assert_eq!(transfer.extra["class_members"]["contribute-13.2"], json!(["donate"]));
    }

    #[test]
    fn test_missing_category_column_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "foo,bar\n1,2\n").unwrap();
        let result = CategoryMappingAdapter::new().parse_task(&ParseTask::single(path));
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }
}
