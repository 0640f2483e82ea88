//! Error types for mapxml.
//!
//! Uses the dual-error pattern: `MapXmlError` for library consumers with
//! detailed error context, and `ConversionError` for value converters, which
//! know the offending text but not the field they were invoked for.

use thiserror::Error;

use xmloxide::error::ParseError;
use xmloxide::xpath::XPathError;

/// Main error type for the mapxml library.
#[derive(Debug, Error)]
pub enum MapXmlError {
    /// Document text could not be parsed as XML.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] ParseError),

    /// Document text could not be parsed, or no document was loaded.
    #[error("Document parsing failed: {0}")]
    Parse(String),

    /// A matched value could not be coerced to the declared field kind.
    #[error("Conversion failed for field '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConversionError,
    },

    /// The schema definition is invalid.
    #[error("Invalid schema configuration: {0}")]
    Configuration(String),

    /// A selector or root query is not a valid path expression.
    #[error("Invalid selector '{selector}': {source}")]
    InvalidSelector {
        selector: String,
        #[source]
        source: XPathError,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned by a field converter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert '{value}' to {target}{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
pub struct ConversionError {
    /// The raw text that was being converted.
    pub value: String,
    /// Name of the target type (e.g. "integer").
    pub target: String,
    /// Optional underlying reason.
    pub reason: Option<String>,
}

impl ConversionError {
    /// Create a conversion error without a reason.
    #[must_use]
    pub fn new(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: target.into(),
            reason: None,
        }
    }

    /// Attach an underlying reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl ToString) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

/// Result type alias for mapxml operations.
pub type Result<T> = std::result::Result<T, MapXmlError>;
