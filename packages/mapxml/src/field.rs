//! Field type descriptors.
//!
//! A [`FieldDescriptor`] says where a field's value lives (its selector),
//! how many matches to expect, whether absence is tolerated, and how the
//! matched text becomes a [`Value`].

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConversionError;
use crate::schema::Schema;
use crate::types::Value;

/// Function turning raw matched text into a value.
///
/// A converter receives the text exactly as matched (untrimmed) and fully
/// replaces the default coercion of the field kind.
pub type Converter = Arc<dyn Fn(&str) -> Result<Value, ConversionError> + Send + Sync>;

/// The closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Trimmed string.
    String,
    /// Trimmed unicode text; identical coercion to `String`.
    #[serde(alias = "unicode")]
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// `true`/`1` or `false`/`0`, case-insensitive.
    Boolean,
    /// Nested record mapped with another schema.
    Node,
}

impl FieldKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Node => "node",
        }
    }
}

/// Immutable description of one schema field.
#[derive(Clone)]
pub struct FieldDescriptor {
    kind: FieldKind,
    selector: String,
    multiple: bool,
    optional: bool,
    nested: Option<Arc<Schema>>,
    converter: Option<Converter>,
}

impl FieldDescriptor {
    /// Create a required, single-valued descriptor.
    #[must_use]
    pub fn new(kind: FieldKind, selector: impl Into<String>) -> Self {
        Self {
            kind,
            selector: selector.into(),
            multiple: false,
            optional: false,
            nested: None,
            converter: None,
        }
    }

    #[must_use]
    pub fn string(selector: impl Into<String>) -> Self {
        Self::new(FieldKind::String, selector)
    }

    #[must_use]
    pub fn text(selector: impl Into<String>) -> Self {
        Self::new(FieldKind::Text, selector)
    }

    #[must_use]
    pub fn integer(selector: impl Into<String>) -> Self {
        Self::new(FieldKind::Integer, selector)
    }

    #[must_use]
    pub fn float(selector: impl Into<String>) -> Self {
        Self::new(FieldKind::Float, selector)
    }

    #[must_use]
    pub fn boolean(selector: impl Into<String>) -> Self {
        Self::new(FieldKind::Boolean, selector)
    }

    /// A nested-record field mapped with `schema`.
    #[must_use]
    pub fn node(selector: impl Into<String>, schema: impl Into<Arc<Schema>>) -> Self {
        Self::new(FieldKind::Node, selector).nested(schema)
    }

    /// Expect zero or more matches and produce a list.
    #[must_use]
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Tolerate zero matches, producing `Value::Null`.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the schema used to map matches of a node field.
    #[must_use]
    pub fn nested(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.nested = Some(schema.into());
        self
    }

    /// Replace the default coercion with a custom converter.
    #[must_use]
    pub fn converter<F>(self, converter: F) -> Self
    where
        F: Fn(&str) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.with_converter(Arc::new(converter))
    }

    /// Like [`FieldDescriptor::converter`] for an already shared converter.
    #[must_use]
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn nested_schema(&self) -> Option<&Schema> {
        self.nested.as_deref()
    }

    #[must_use]
    pub fn has_converter(&self) -> bool {
        self.converter.is_some()
    }

    /// Convert raw matched text to this field's value.
    ///
    /// # Errors
    /// Returns `ConversionError` when the text is not a valid literal of the
    /// field kind, or whatever the custom converter reports.
    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        if let Some(converter) = &self.converter {
            return converter(raw);
        }

        let target = self.kind.as_str();
        match self.kind {
            FieldKind::String | FieldKind::Text => Ok(Value::String(raw.trim().to_string())),
            FieldKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| ConversionError::new(raw, target).with_reason(e)),
            FieldKind::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ConversionError::new(raw, target).with_reason(e)),
            FieldKind::Boolean => parse_boolean(raw).map(Value::Boolean),
            FieldKind::Node => Err(ConversionError::new(raw, target)
                .with_reason("node fields are mapped with their nested schema")),
        }
    }
}

fn parse_boolean(raw: &str) -> Result<bool, ConversionError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConversionError::new(raw, FieldKind::Boolean.as_str())
            .with_reason("expected true, false, 1 or 0")),
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("kind", &self.kind)
            .field("selector", &self.selector)
            .field("multiple", &self.multiple)
            .field("optional", &self.optional)
            .field("nested", &self.nested.as_ref().map(|s| s.name()))
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}
