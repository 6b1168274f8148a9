//! Nourish - Catalog linter
//!
//! Reports the row problems the loader absorbed (skipped rows, unreadable
//! scores, absent columns) together with per-item gaps, so a catalog editor
//! can see what the engine had to paper over.

use std::collections::HashSet;

use crate::config::Role;
use crate::data::Catalog;
use crate::model::FoodItem;

/// Types of lint errors
#[derive(Debug, Clone, PartialEq)]
pub enum LintError {
    /// A mapped column is absent from the header row
    MissingColumn { role: Role, header: String },
    /// The CSV record could not be parsed
    MalformedRow(String),
    /// Row has no identifier and was skipped
    MissingIdentifier,
    /// Row repeats an earlier identifier and was skipped
    DuplicateIdentifier(String),
    /// Score cell is not a number
    InvalidScore(String),
    /// Score is numeric but outside 0-10
    ScoreOutOfRange(f64),
    /// Item has no score; any min-score filter excludes it
    MissingScore,
    /// Item lacks a value for a required role
    MissingField(Role),
}

impl LintError {
    pub fn message(&self) -> String {
        match self {
            LintError::MissingColumn { role, header } => {
                format!("Column '{}' for role '{}' not found", header, role)
            }
            LintError::MalformedRow(e) => format!("Malformed row: {}", e),
            LintError::MissingIdentifier => "Missing identifier, row skipped".to_string(),
            LintError::DuplicateIdentifier(name) => {
                format!("Duplicate identifier '{}', row skipped", name)
            }
            LintError::InvalidScore(raw) => format!("Unreadable score '{}'", raw),
            LintError::ScoreOutOfRange(value) => format!("Score {} outside 0-10", value),
            LintError::MissingScore => "No score, excluded by score filters".to_string(),
            LintError::MissingField(role) => format!("Missing value for '{}'", role),
        }
    }

    pub fn severity(&self) -> &'static str {
        match self {
            LintError::MissingColumn { role, .. } if role.is_required() => "ERROR",
            LintError::MissingColumn { .. } => "WARNING",
            LintError::MalformedRow(_) => "ERROR",
            LintError::MissingIdentifier => "ERROR",
            LintError::DuplicateIdentifier(_) => "ERROR",
            LintError::InvalidScore(_) => "WARNING",
            LintError::ScoreOutOfRange(_) => "WARNING",
            LintError::MissingScore => "WARNING",
            LintError::MissingField(_) => "WARNING",
        }
    }

    fn is_score_issue(&self) -> bool {
        matches!(
            self,
            LintError::InvalidScore(_) | LintError::ScoreOutOfRange(_)
        )
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq)]
pub struct LintResult {
    /// Data row (0-indexed, header excluded); `None` for whole-file findings
    pub row: Option<usize>,
    /// Identifier of the affected item, when known
    pub item: Option<String>,
    pub error: LintError,
}

impl LintResult {
    pub fn file(error: LintError) -> Self {
        Self {
            row: None,
            item: None,
            error,
        }
    }

    pub fn row(row: usize, item: Option<&str>, error: LintError) -> Self {
        Self {
            row: Some(row),
            item: item.map(str::to_string),
            error,
        }
    }

    /// `row 3 (Salmon)`, `row 3`, or `file`
    pub fn location(&self) -> String {
        match (self.row, &self.item) {
            (Some(row), Some(item)) => format!("row {} ({})", row + 1, item),
            (Some(row), None) => format!("row {}", row + 1),
            (None, _) => "file".to_string(),
        }
    }
}

/// Linter for food catalogs
pub struct Linter {
    required_roles: Vec<Role>,
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

impl Linter {
    /// Create a linter that checks every required role
    pub fn new() -> Self {
        Self {
            required_roles: Role::ALL
                .into_iter()
                .filter(|r| r.is_required() && !matches!(r, Role::Identifier | Role::Score))
                .collect(),
        }
    }

    /// Replace the roles checked for missing values
    pub fn with_required_roles(mut self, roles: Vec<Role>) -> Self {
        self.required_roles = roles;
        self
    }

    /// Load-time findings followed by per-item checks, in row order
    pub fn lint_catalog(&self, catalog: &Catalog) -> Vec<LintResult> {
        let mut results: Vec<LintResult> = catalog.issues().to_vec();

        let score_issue_rows: HashSet<usize> = results
            .iter()
            .filter(|r| r.error.is_score_issue())
            .filter_map(|r| r.row)
            .collect();
        let missing_columns: HashSet<Role> = catalog.missing_columns().iter().copied().collect();

        for (index, item) in catalog.items().iter().enumerate() {
            let row = catalog.source_row(index);

            if item.score.is_none()
                && !missing_columns.contains(&Role::Score)
                && !score_issue_rows.contains(&row)
            {
                results.push(LintResult::row(row, Some(&item.name), LintError::MissingScore));
            }

            for role in &self.required_roles {
                if missing_columns.contains(role) {
                    continue;
                }
                if !has_value(item, *role) {
                    results.push(LintResult::row(
                        row,
                        Some(&item.name),
                        LintError::MissingField(*role),
                    ));
                }
            }
        }

        results.sort_by_key(|r| r.row.map_or(0, |row| row + 1));
        results
    }
}

fn has_value(item: &FoodItem, role: Role) -> bool {
    match role {
        Role::Identifier => !item.name.is_empty(),
        Role::Category => item.category.is_some(),
        Role::Score => item.score.is_some(),
        Role::Flags => item.flags_raw.is_some(),
        Role::Nutrients => item.nutrients_raw.is_some(),
        other => other
            .text_field()
            .map(|field| item.text_opt(field).is_some())
            .unwrap_or(true),
    }
}
