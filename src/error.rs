//! Error taxonomy for a search run.
//!
//! Only [`InvalidCriteria`] aborts a search. Everything else is isolated to a
//! single record or a single platform.

use thiserror::Error;

/// Search criteria rejected at construction, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct InvalidCriteria {
    pub field: &'static str,
    pub reason: String,
}

impl InvalidCriteria {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// The page-fetch collaborator could not render or interact with a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rendering failed: {0}")]
pub struct RenderingError(pub String);

impl RenderingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure of one adapter step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("form fill failed: {0}")]
    FormFill(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Rendering(#[from] RenderingError),

    /// No listing cards and no "no results" indicator on the page.
    #[error("results page rendered no listings and no empty-result indicator")]
    EmptyPage,
}

impl AdapterError {
    /// Whether the failing step may be retried in place.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::Navigation(_)
                | AdapterError::FormFill(_)
                | AdapterError::Extraction(_)
                | AdapterError::Rendering(_)
                | AdapterError::EmptyPage
        )
    }
}

/// The rate collaborator has no conversion for this pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no conversion rate from {from} to {to}")]
pub struct RateConversionUnavailable {
    pub from: String,
    pub to: String,
}

/// A raw record that could not be canonicalized. The record is dropped and
/// counted; the adapter carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("record {id:?} is missing {field}")]
    MissingField { id: String, field: &'static str },

    #[error("record {id:?} has unparseable price {text:?}")]
    Price { id: String, text: String },

    #[error("record {id:?} price cannot be converted: {source}")]
    Rate {
        id: String,
        #[source]
        source: RateConversionUnavailable,
    },
}
