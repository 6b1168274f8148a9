//! Nourish - Engine error taxonomy
//!
//! Only conditions that stop a session are errors. Row-level problems are
//! absorbed by the loader and reported through [`crate::lint`]; plan no-ops are
//! [`crate::plan::PlanNotice`] values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The dataset cannot be read or decoded. Fatal to the session.
    #[error("dataset unavailable ({source_name}): {reason}")]
    DataUnavailable { source_name: String, reason: String },

    /// The column mapping does not fit the configuration or the dataset header.
    #[error("invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        EngineError::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
