//! Nourish - Layered configuration
//!
//! Uses Figment to merge serialized defaults + an optional TOML file +
//! `NOURISH_*` environment variables (`__` separates nested keys, e.g.
//! `NOURISH_DATASET__PATH`).
//!
//! The catalog's column headers have been renamed more than once, so the
//! engine never hardcodes them: every column is reached through a [`Role`]
//! and the [`ColumnMapping`] is validated once, before any row is read.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::model::TextField;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "nourish.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "NOURISH_";

/// Semantic role of a catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Identifier,
    Category,
    SubCategory,
    Score,
    ScoreJustification,
    Mechanism,
    Flags,
    Nutrients,
    BestForm,
    BestFor,
    Recipe,
    Cautions,
    Regional,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::Identifier,
        Role::Category,
        Role::SubCategory,
        Role::Score,
        Role::ScoreJustification,
        Role::Mechanism,
        Role::Flags,
        Role::Nutrients,
        Role::BestForm,
        Role::BestFor,
        Role::Recipe,
        Role::Cautions,
        Role::Regional,
    ];

    /// Sub-category and score justification may be left unmapped.
    pub fn is_required(&self) -> bool {
        !matches!(self, Role::SubCategory | Role::ScoreJustification)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Identifier => "identifier",
            Role::Category => "category",
            Role::SubCategory => "sub_category",
            Role::Score => "score",
            Role::ScoreJustification => "score_justification",
            Role::Mechanism => "mechanism",
            Role::Flags => "flags",
            Role::Nutrients => "nutrients",
            Role::BestForm => "best_form",
            Role::BestFor => "best_for",
            Role::Recipe => "recipe",
            Role::Cautions => "cautions",
            Role::Regional => "regional",
        }
    }

    /// The free-text field this role fills, if it is a plain text column.
    pub fn text_field(&self) -> Option<TextField> {
        match self {
            Role::SubCategory => Some(TextField::SubCategory),
            Role::ScoreJustification => Some(TextField::ScoreJustification),
            Role::Mechanism => Some(TextField::Mechanism),
            Role::BestForm => Some(TextField::BestForm),
            Role::BestFor => Some(TextField::BestFor),
            Role::Recipe => Some(TextField::Recipe),
            Role::Cautions => Some(TextField::Cautions),
            Role::Regional => Some(TextField::Regional),
            Role::Identifier | Role::Category | Role::Score | Role::Flags | Role::Nutrients => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header text for every column role. An empty string leaves an optional role unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub identifier: String,
    pub category: String,
    pub sub_category: String,
    pub score: String,
    pub score_justification: String,
    pub mechanism: String,
    pub flags: String,
    pub nutrients: String,
    pub best_form: String,
    pub best_for: String,
    pub recipe: String,
    pub cautions: String,
    pub regional: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            identifier: "Food Item".into(),
            category: "Category".into(),
            sub_category: "Sub-category".into(),
            score: "Score (0–10)".into(),
            score_justification: "Score Justification".into(),
            mechanism: "Why Anti-Inflammatory".into(),
            flags: "Flags (Female Health Issues)".into(),
            nutrients: "Key Vitamins & Minerals".into(),
            best_form: "Best Type/Form".into(),
            best_for: "Best For".into(),
            recipe: "Sample Recipe/Usage".into(),
            cautions: "Cautions".into(),
            regional: "Regional Availability".into(),
        }
    }
}

impl ColumnMapping {
    pub fn header(&self, role: Role) -> &str {
        match role {
            Role::Identifier => &self.identifier,
            Role::Category => &self.category,
            Role::SubCategory => &self.sub_category,
            Role::Score => &self.score,
            Role::ScoreJustification => &self.score_justification,
            Role::Mechanism => &self.mechanism,
            Role::Flags => &self.flags,
            Role::Nutrients => &self.nutrients,
            Role::BestForm => &self.best_form,
            Role::BestFor => &self.best_for,
            Role::Recipe => &self.recipe,
            Role::Cautions => &self.cautions,
            Role::Regional => &self.regional,
        }
    }

    /// Roles that have a header configured.
    pub fn mapped_roles(&self) -> impl Iterator<Item = (Role, &str)> {
        Role::ALL
            .into_iter()
            .map(|role| (role, self.header(role).trim()))
            .filter(|(_, header)| !header.is_empty())
    }

    /// Reject unmapped required roles and headers claimed by two roles.
    pub fn validate(&self) -> Result<()> {
        for role in Role::ALL {
            if role.is_required() && self.header(role).trim().is_empty() {
                return Err(EngineError::InvalidMapping(format!(
                    "required role '{}' has no column header",
                    role
                )));
            }
        }

        let mut seen: HashMap<String, Role> = HashMap::new();
        for (role, header) in self.mapped_roles() {
            if let Some(other) = seen.insert(normalize_header(header), role) {
                return Err(EngineError::InvalidMapping(format!(
                    "header '{}' is mapped to both '{}' and '{}'",
                    header, other, role
                )));
            }
        }

        Ok(())
    }
}

/// Canonical form used when matching configured headers against the file.
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Catalog CSV location; `-` reads stdin.
    pub path: PathBuf,
    /// Cautions cell value meaning "nothing to warn about".
    pub no_caution_sentinel: String,
    /// Capacity of the memoized catalog cache.
    pub cache_capacity: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/anti_inflammatory_foods.csv"),
            no_caution_sentinel: "None specific.".into(),
            cache_capacity: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    pub timeout_secs: u64,
    /// External generator command and arguments. Empty uses the built-in template.
    pub command: Vec<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub columns: ColumnMapping,
    pub narrator: NarratorConfig,
}

impl Config {
    /// Load defaults, then `path` (or `nourish.toml` if present), then env overrides.
    ///
    /// An explicitly requested file must exist; the implicit one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) if !p.exists() => {
                return Err(EngineError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )))
            }
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(figment)
    }

    /// Extract and validate from an already-assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .extract()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.columns.validate()?;
        if self.dataset.cache_capacity == 0 {
            return Err(EngineError::Config(
                "dataset.cache_capacity must be at least 1".into(),
            ));
        }
        if self.narrator.timeout_secs == 0 {
            return Err(EngineError::Config(
                "narrator.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn narrator_timeout(&self) -> Duration {
        Duration::from_secs(self.narrator.timeout_secs)
    }
}
