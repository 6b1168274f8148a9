//! Nourish - Filter and plan engine for an anti-inflammatory food catalog.
//!
//! Loads the catalog CSV once, answers filtered and sorted queries over it,
//! and keeps a per-session meal plan with derived nutrient, caution and
//! recipe aggregates.
//!
//! ## Layout
//!
//! - **Loading** (`config`, `data`, `cache`, `tokens`): column mapping,
//!   encoding fallback, multi-value field parsing and memoized loads.
//! - **Querying** (`filter`, `rank`): four-dimension filtering and
//!   deterministic ordering.
//! - **Planning** (`plan`, `aggregate`, `session`, `narrator`): plan state
//!   transitions, aggregates and optional text generation with a timeout.
//! - **Inspection** (`lint`): reports the row problems absorbed at load time.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod lint;
pub mod model;
pub mod narrator;
pub mod plan;
pub mod rank;
pub mod session;
pub mod tokens;

pub use error::{EngineError, Result};
