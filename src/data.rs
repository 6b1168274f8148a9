//! Nourish - Catalog loading
//!
//! Reads the food CSV into an immutable, ordered [`Catalog`]. Decoding tries
//! UTF-8 first (BOM stripped) and falls back to ISO-8859-1, which accepts every
//! byte. Row-level problems never fail the load: the row is repaired or
//! skipped and the finding is kept for [`crate::lint`].

use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::{normalize_header, ColumnMapping, Role};
use crate::error::{EngineError, Result};
use crate::filter::Vocabulary;
use crate::lint::{LintError, LintResult};
use crate::model::{FoodItem, Score};
use crate::tokens::TokenSet;

/// Path understood as "read the catalog from stdin".
pub const STDIN_PATH: &str = "-";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Character encoding the catalog was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1 fallback for files that are not valid UTF-8
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }
}

/// Decode raw catalog bytes, preferring UTF-8.
pub fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, TextEncoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), TextEncoding::Utf8),
        Err(e) => {
            debug!("UTF-8 decode failed at byte {}", e.valid_up_to());
            // Every byte is a valid ISO-8859-1 code point.
            let text: String = bytes.iter().map(|&b| b as char).collect();
            (Cow::Owned(text), TextEncoding::Latin1)
        }
    }
}

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([+-]?\d+(?:\.\d+)?)(?:\s*/\s*10)?$").expect("valid regex: score")
    })
}

/// Parse a score cell: `8`, `8.5` or `8/10`.
pub fn parse_score(raw: &str) -> std::result::Result<Score, LintError> {
    let raw = raw.trim();
    let value: f64 = score_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| LintError::InvalidScore(raw.to_string()))?;

    Score::new(value).ok_or(LintError::ScoreOutOfRange(value))
}

/// Header positions for each mapped role
struct ColumnIndex {
    positions: HashMap<Role, usize>,
}

impl ColumnIndex {
    /// Match the configured headers against the file's header row.
    ///
    /// A missing identifier column is fatal; any other missing column is
    /// reported and its values are left absent.
    fn resolve(
        headers: &csv::StringRecord,
        mapping: &ColumnMapping,
    ) -> Result<(Self, Vec<Role>, Vec<LintResult>)> {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header(h), i))
            .collect();

        let mut positions = HashMap::new();
        let mut missing = Vec::new();
        let mut issues = Vec::new();

        for (role, header) in mapping.mapped_roles() {
            match by_name.get(&normalize_header(header)) {
                Some(&index) => {
                    positions.insert(role, index);
                }
                None if role == Role::Identifier => {
                    return Err(EngineError::InvalidMapping(format!(
                        "identifier column '{}' not found in header [{}]",
                        header,
                        headers.iter().collect::<Vec<_>>().join(", ")
                    )));
                }
                None => {
                    if role.is_required() {
                        warn!("Column '{}' ({}) missing; values shown as N/A", header, role);
                    } else {
                        debug!("Optional column '{}' ({}) not present", header, role);
                    }
                    missing.push(role);
                    issues.push(LintResult::file(LintError::MissingColumn {
                        role,
                        header: header.to_string(),
                    }));
                }
            }
        }

        Ok((Self { positions }, missing, issues))
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, role: Role) -> Option<&'r str> {
        let index = *self.positions.get(&role)?;
        record
            .get(index)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Build one item from a record. `None` when the row has no identifier.
    fn build_item(
        &self,
        record: &csv::StringRecord,
        row: usize,
        issues: &mut Vec<LintResult>,
    ) -> Option<FoodItem> {
        let Some(name) = self.cell(record, Role::Identifier) else {
            issues.push(LintResult::row(row, None, LintError::MissingIdentifier));
            return None;
        };

        let mut item = FoodItem::new(name);
        item.category = self.cell(record, Role::Category).map(str::to_string);
        item.score = self
            .cell(record, Role::Score)
            .and_then(|raw| match parse_score(raw) {
                Ok(score) => Some(score),
                Err(error) => {
                    issues.push(LintResult::row(row, Some(name), error));
                    None
                }
            });

        item.flags_raw = self.cell(record, Role::Flags).map(str::to_string);
        item.flags = TokenSet::parse(item.flags_raw.as_deref());
        item.nutrients_raw = self.cell(record, Role::Nutrients).map(str::to_string);
        item.nutrients = TokenSet::parse(item.nutrients_raw.as_deref());

        for role in Role::ALL {
            if let Some(field) = role.text_field() {
                *item.text_slot(field) = self.cell(record, role).map(str::to_string);
            }
        }

        Some(item)
    }
}

/// The loaded food catalog: read-only after construction, in source row order.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<FoodItem>,
    /// Source data row of each item
    rows: Vec<usize>,
    index: HashMap<String, usize>,
    issues: Vec<LintResult>,
    missing_columns: Vec<Role>,
    vocabulary: OnceLock<Vocabulary>,
    /// Source description for display
    pub source: String,
    /// Source size in bytes
    pub size: u64,
    pub encoding: TextEncoding,
}

impl Catalog {
    fn empty(source: &str, size: u64, encoding: TextEncoding) -> Self {
        Self {
            items: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
            issues: Vec::new(),
            missing_columns: Vec::new(),
            vocabulary: OnceLock::new(),
            source: source.to_string(),
            size,
            encoding,
        }
    }

    /// Open `path`, or stdin when `path` is `-`.
    pub fn load<P: AsRef<Path>>(path: P, mapping: &ColumnMapping) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == STDIN_PATH {
            Self::from_stdin(mapping)
        } else {
            Self::open(path, mapping)
        }
    }

    /// Read a catalog file
    pub fn open<P: AsRef<Path>>(path: P, mapping: &ColumnMapping) -> Result<Self> {
        let path_ref = path.as_ref();
        let source = path_ref.display().to_string();
        let bytes = std::fs::read(path_ref).map_err(|e| EngineError::unavailable(&source, e))?;
        Self::from_bytes(&bytes, &source, mapping)
    }

    /// Read a catalog from stdin
    ///
    /// Supports pipeline workflows: `cat foods.csv | nourish -d - list`
    pub fn from_stdin(mapping: &ColumnMapping) -> Result<Self> {
        let mut buffer = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .map_err(|e| EngineError::unavailable("<stdin>", e))?;
        Self::from_bytes(&buffer, "<stdin>", mapping)
    }

    /// Parse catalog CSV bytes
    pub fn from_bytes(bytes: &[u8], source: &str, mapping: &ColumnMapping) -> Result<Self> {
        mapping.validate()?;

        let (text, encoding) = decode_text(bytes);
        if encoding == TextEncoding::Latin1 {
            warn!("{} is not valid UTF-8; decoded as {}", source, encoding.label());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| EngineError::unavailable(source, e))?
            .clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(EngineError::unavailable(source, "no header row"));
        }

        let (columns, missing_columns, issues) = ColumnIndex::resolve(&headers, mapping)?;

        let mut catalog = Self::empty(source, bytes.len() as u64, encoding);
        catalog.issues = issues;
        catalog.missing_columns = missing_columns;

        for (row, result) in reader.records().enumerate() {
            match result {
                Ok(record) => {
                    let mut row_issues = Vec::new();
                    if let Some(item) = columns.build_item(&record, row, &mut row_issues) {
                        catalog.push(item, row);
                    }
                    catalog.issues.extend(row_issues);
                }
                Err(e) => {
                    warn!("Skipping malformed row {}: {}", row + 1, e);
                    catalog
                        .issues
                        .push(LintResult::row(row, None, LintError::MalformedRow(e.to_string())));
                }
            }
        }

        info!(
            "Loaded {} items from {} ({}, {} issues)",
            catalog.len(),
            source,
            encoding.label(),
            catalog.issues.len()
        );

        Ok(catalog)
    }

    /// Build a catalog from in-memory items (embedding and tests).
    ///
    /// Applies the same identifier rules as file loading.
    pub fn from_items(items: Vec<FoodItem>) -> Self {
        let mut catalog = Self::empty("<memory>", 0, TextEncoding::Utf8);
        for (row, item) in items.into_iter().enumerate() {
            if item.name.trim().is_empty() {
                catalog
                    .issues
                    .push(LintResult::row(row, None, LintError::MissingIdentifier));
                continue;
            }
            catalog.push(item, row);
        }
        catalog
    }

    /// Append an item; a repeated identifier is recorded and dropped.
    fn push(&mut self, item: FoodItem, row: usize) {
        if self.index.contains_key(&item.name) {
            warn!("Duplicate item '{}' at row {} ignored", item.name, row + 1);
            self.issues.push(LintResult::row(
                row,
                Some(&item.name),
                LintError::DuplicateIdentifier(item.name.clone()),
            ));
            return;
        }
        self.index.insert(item.name.clone(), self.items.len());
        self.items.push(item);
        self.rows.push(row);
    }

    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by identifier
    pub fn get(&self, name: &str) -> Option<&FoodItem> {
        self.index.get(name).map(|&i| &self.items[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Source data row of the item at `index` (0-indexed, header excluded)
    pub fn source_row(&self, index: usize) -> usize {
        self.rows.get(index).copied().unwrap_or(index)
    }

    /// Problems absorbed while loading
    pub fn issues(&self) -> &[LintResult] {
        &self.issues
    }

    /// Mapped roles whose column was absent from the header
    pub fn missing_columns(&self) -> &[Role] {
        &self.missing_columns
    }

    /// Filterable values present in the catalog, built on first use
    pub fn vocabulary(&self) -> &Vocabulary {
        self.vocabulary
            .get_or_init(|| Vocabulary::from_items(&self.items))
    }

    /// Get formatted source size string
    pub fn size_human(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;

        if self.size >= MB {
            format!("{:.2} MB", self.size as f64 / MB as f64)
        } else if self.size >= KB {
            format!("{:.2} KB", self.size as f64 / KB as f64)
        } else {
            format!("{} B", self.size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TextField, NOT_AVAILABLE};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Food Item,Category,Score (0–10),Why Anti-Inflammatory,Flags (Female Health Issues),Key Vitamins & Minerals,Best Type/Form,Best For,Sample Recipe/Usage,Cautions,Regional Availability";

    fn csv_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_open_preserves_row_order() -> anyhow::Result<()> {
        let body = format!(
            "{HEADER}\n\
             Blueberries,Fruit,8,Anthocyanins,\"PCOS, Menopause\",\"Vitamin C, Fiber\",Fresh,Brain,Smoothie,None specific.,Worldwide\n\
             Salmon,Fish,9,Omega-3,Menopause,\"Omega-3, Vitamin D\",Wild,Heart,Baked,Mercury,Coastal\n"
        );
        let file = csv_file(body.as_bytes());
        let catalog = Catalog::open(file.path(), &ColumnMapping::default())?;

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.items()[0].name, "Blueberries");
        assert_eq!(catalog.items()[1].name, "Salmon");
        assert_eq!(catalog.encoding, TextEncoding::Utf8);

        let blueberries = catalog.get("Blueberries").unwrap();
        assert_eq!(blueberries.category.as_deref(), Some("Fruit"));
        assert_eq!(blueberries.score, Score::new(8.0));
        assert!(blueberries.flags.contains("PCOS"));
        assert!(blueberries.nutrients.contains("Fiber"));
        assert_eq!(blueberries.text(TextField::Recipe), "Smoothie");
        Ok(())
    }

    #[test]
    fn test_bom_is_stripped() -> anyhow::Result<()> {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(format!("{HEADER}\nKale,Vegetable,7,,,,,,,,\n").as_bytes());
        let file = csv_file(&bytes);
        let catalog = Catalog::open(file.path(), &ColumnMapping::default())?;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.encoding, TextEncoding::Utf8);
        Ok(())
    }

    #[test]
    fn test_latin1_fallback() -> anyhow::Result<()> {
        let mut bytes = b"Food Item,Category,Score,Why Anti-Inflammatory,Flags (Female Health Issues),Key Vitamins & Minerals,Best Type/Form,Best For,Sample Recipe/Usage,Cautions,Regional Availability\n".to_vec();
        // "Pur\xe9e" is "Purée" in ISO-8859-1 and invalid UTF-8.
        bytes.extend_from_slice(b"Pumpkin Pur\xe9e,Vegetable,6,,,,,,,,\n");
        let file = csv_file(&bytes);
        let mapping = ColumnMapping {
            score: "Score".into(),
            ..ColumnMapping::default()
        };

        let catalog = Catalog::open(file.path(), &mapping)?;
        assert_eq!(catalog.encoding, TextEncoding::Latin1);
        assert!(catalog.get("Pumpkin Purée").is_some());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = Catalog::open("/no/such/catalog.csv", &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
    }

    #[test]
    fn test_empty_file_is_unavailable() {
        let file = csv_file(b"");
        let err = Catalog::open(file.path(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
    }

    #[test]
    fn test_missing_identifier_column_fails_fast() {
        let file = csv_file(b"Name,Category\nKale,Vegetable\n");
        let err = Catalog::open(file.path(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMapping(_)));
    }

    #[test]
    fn test_missing_columns_use_placeholder() -> anyhow::Result<()> {
        let file = csv_file("Food Item,Category,Score (0–10)\nKale,Vegetable,7\n".as_bytes());
        let catalog = Catalog::open(file.path(), &ColumnMapping::default())?;

        let kale = catalog.get("Kale").unwrap();
        assert_eq!(kale.text(TextField::Recipe), NOT_AVAILABLE);
        assert!(kale.flags.is_empty());
        assert!(catalog.missing_columns().contains(&Role::Recipe));
        assert!(catalog.missing_columns().contains(&Role::SubCategory));
        assert!(catalog
            .issues()
            .iter()
            .any(|r| matches!(r.error, LintError::MissingColumn { role: Role::Cautions, .. })));
        Ok(())
    }

    #[test]
    fn test_header_match_ignores_case_and_spacing() -> anyhow::Result<()> {
        let file = csv_file(b"  food item , CATEGORY\nKale,Vegetable\n");
        let catalog = Catalog::open(file.path(), &ColumnMapping::default())?;
        assert_eq!(catalog.get("Kale").unwrap().category.as_deref(), Some("Vegetable"));
        Ok(())
    }

    #[test]
    fn test_row_problems_are_absorbed() -> anyhow::Result<()> {
        let body = format!(
            "{HEADER}\n\
             Kale,Vegetable,7\n\
             ,Fruit,5\n\
             Kale,Vegetable,3\n\
             Ginger,Root,high\n\
             Garlic,Bulb,12\n\
             Oats,Grain,8/10\n"
        );
        let file = csv_file(body.as_bytes());
        let catalog = Catalog::open(file.path(), &ColumnMapping::default())?;

        let names: Vec<&str> = catalog.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Kale", "Ginger", "Garlic", "Oats"]);
        // First occurrence wins.
        assert_eq!(catalog.get("Kale").unwrap().score, Score::new(7.0));
        assert!(catalog.get("Ginger").unwrap().score.is_none());
        assert!(catalog.get("Garlic").unwrap().score.is_none());
        assert_eq!(catalog.get("Oats").unwrap().score, Score::new(8.0));

        let errors: Vec<&LintError> = catalog.issues().iter().map(|r| &r.error).collect();
        assert!(errors.contains(&&LintError::MissingIdentifier));
        assert!(errors.contains(&&LintError::DuplicateIdentifier("Kale".into())));
        assert!(errors.contains(&&LintError::InvalidScore("high".into())));
        assert!(errors.contains(&&LintError::ScoreOutOfRange(12.0)));
        Ok(())
    }

    #[test]
    fn test_custom_mapping() -> anyhow::Result<()> {
        let file = csv_file(b"Food,Group,Rating\nKale,Vegetable,7\n");
        let mapping = ColumnMapping {
            identifier: "Food".into(),
            category: "Group".into(),
            score: "Rating".into(),
            ..ColumnMapping::default()
        };
        let catalog = Catalog::open(file.path(), &mapping)?;
        let kale = catalog.get("Kale").unwrap();
        assert_eq!(kale.category.as_deref(), Some("Vegetable"));
        assert_eq!(kale.score, Score::new(7.0));
        Ok(())
    }

    #[test]
    fn test_parse_score_forms() {
        assert_eq!(parse_score("8"), Ok(Score::new(8.0).unwrap()));
        assert_eq!(parse_score(" 8.5 "), Ok(Score::new(8.5).unwrap()));
        assert_eq!(parse_score("7 / 10"), Ok(Score::new(7.0).unwrap()));
        assert_eq!(parse_score("-1"), Err(LintError::ScoreOutOfRange(-1.0)));
        assert_eq!(parse_score("n/a"), Err(LintError::InvalidScore("n/a".into())));
    }

    #[test]
    fn test_from_items_drops_duplicates() {
        let catalog = Catalog::from_items(vec![
            FoodItem::new("A").with_score(1.0),
            FoodItem::new("A").with_score(2.0),
            FoodItem::new(""),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("A").unwrap().score, Score::new(1.0));
        assert_eq!(catalog.issues().len(), 2);
    }

    #[test]
    fn test_vocabulary_is_built_once() {
        let catalog = Catalog::from_items(vec![
            FoodItem::new("Kale").with_category("Vegetable").with_flags("PCOS"),
            FoodItem::new("Oats").with_category("Grain"),
        ]);
        let first = catalog.vocabulary();
        assert!(std::ptr::eq(first, catalog.vocabulary()));
        assert_eq!(first.categories.len(), 2);
        assert_eq!(first.flags.to_vec(), vec!["PCOS"]);
    }

    #[test]
    fn test_size_human() {
        let mut catalog = Catalog::from_items(Vec::new());
        catalog.size = 512;
        assert_eq!(catalog.size_human(), "512 B");
        catalog.size = 1536;
        assert_eq!(catalog.size_human(), "1.50 KB");
    }
}
