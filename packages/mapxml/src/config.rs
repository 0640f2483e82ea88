//! Configuration constants, validation and declarative schema files.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use chrono::DateTime;
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ConversionError, MapXmlError, Result};
use crate::field::{Converter, FieldDescriptor, FieldKind};
use crate::schema::Schema;
use crate::types::Value;

/// Output format used by the CLI when none is given.
pub const DEFAULT_OUTPUT_FORMAT: &str = "json";

/// Names accepted by [`builtin_converter`].
pub const BUILTIN_CONVERTERS: &[&str] = &[
    "unix_timestamp",
    "raw",
    "lowercase",
    "uppercase",
    "normalize_space",
];

/// Root element name: an XML name with an optional prefix, or `*`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ROOT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[A-Za-z_][\w.\-]*(:[A-Za-z_][\w.\-]*)?)$").expect("valid regex")
});

/// Validate a root element name.
///
/// # Examples
/// ```
/// use mapxml::config::validate_root_name;
///
/// assert!(validate_root_name("item").is_ok());
/// assert!(validate_root_name("*").is_ok());
/// assert!(validate_root_name("item[1]").is_err());
/// ```
pub fn validate_root_name(name: &str) -> Result<()> {
    if ROOT_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MapXmlError::Configuration(format!(
            "invalid root element name '{name}'"
        )))
    }
}

/// Look up a built-in converter by name.
#[must_use]
pub fn builtin_converter(name: &str) -> Option<Converter> {
    let converter: Converter = match name {
        "unix_timestamp" => Arc::new(unix_timestamp),
        "raw" => Arc::new(|raw: &str| Ok(Value::String(raw.to_string()))),
        "lowercase" => Arc::new(|raw: &str| Ok(Value::String(raw.trim().to_lowercase()))),
        "uppercase" => Arc::new(|raw: &str| Ok(Value::String(raw.trim().to_uppercase()))),
        "normalize_space" => Arc::new(normalize_space),
        _ => return None,
    };
    Some(converter)
}

/// Convert seconds since the Unix epoch (fractions allowed) to a UTC datetime.
///
/// # Errors
/// Returns `ConversionError` for non-numeric or out-of-range input.
pub fn unix_timestamp(raw: &str) -> std::result::Result<Value, ConversionError> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ConversionError::new(raw, "timestamp").with_reason(e))?;
    if !seconds.is_finite() {
        return Err(ConversionError::new(raw, "timestamp").with_reason("not a finite number"));
    }

    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
        .map(Value::DateTime)
        .ok_or_else(|| ConversionError::new(raw, "timestamp").with_reason("out of range"))
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_space(raw: &str) -> std::result::Result<Value, ConversionError> {
    Ok(Value::String(
        raw.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

/// A schema declared in a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub name: String,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    /// Namespace prefix bindings; nested schemas without their own inherit
    /// these.
    #[serde(default)]
    pub namespaces: IndexMap<String, String>,
    /// Compare names by local name only.
    #[serde(default)]
    pub match_local_names: bool,
    /// Fields in declaration order.
    pub fields: IndexMap<String, FieldConfig>,
}

/// One field of a [`SchemaConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub kind: FieldKind,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub optional: bool,
    /// Name of a built-in converter.
    #[serde(default)]
    pub converter: Option<String>,
    /// Nested schema for `node` fields.
    #[serde(default)]
    pub schema: Option<Box<SchemaConfig>>,
}

impl SchemaConfig {
    /// Parse a schema declaration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read and parse a schema declaration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Build the declared schema, including nested schemas.
    ///
    /// # Errors
    /// Returns `Configuration` for unknown converters and anything
    /// [`SchemaBuilder::build`](crate::schema::SchemaBuilder::build) rejects.
    pub fn into_schema(self) -> Result<Schema> {
        let mut builder = Schema::builder(self.name);
        if let Some(root) = self.root {
            builder = builder.root(root);
        }
        if let Some(condition) = self.condition {
            builder = builder.condition(condition);
        }
        for (prefix, uri) in &self.namespaces {
            builder = builder.namespace(prefix, uri);
        }
        if self.match_local_names {
            builder = builder.match_local_names();
        }

        for (name, field) in self.fields {
            let descriptor =
                field.into_descriptor(&name, &self.namespaces, self.match_local_names)?;
            builder = builder.field(name, descriptor);
        }

        builder.build()
    }
}

impl FieldConfig {
    fn into_descriptor(
        self,
        name: &str,
        namespaces: &IndexMap<String, String>,
        match_local_names: bool,
    ) -> Result<FieldDescriptor> {
        let mut descriptor = FieldDescriptor::new(self.kind, self.selector);
        if self.multiple {
            descriptor = descriptor.multiple();
        }
        if self.optional {
            descriptor = descriptor.optional();
        }
        if let Some(converter) = self.converter {
            let resolved = builtin_converter(&converter).ok_or_else(|| {
                MapXmlError::Configuration(format!(
                    "field '{name}' uses unknown converter '{converter}' (expected one of: {})",
                    BUILTIN_CONVERTERS.join(", ")
                ))
            })?;
            descriptor = descriptor.with_converter(resolved);
        }
        if let Some(mut schema) = self.schema {
            if schema.namespaces.is_empty() {
                schema.namespaces = namespaces.clone();
            }
            schema.match_local_names |= match_local_names;
            descriptor = descriptor.nested(schema.into_schema()?);
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::NameMatching;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_root_name_valid() {
        assert!(validate_root_name("item").is_ok());
        assert!(validate_root_name("div").is_ok());
        assert!(validate_root_name("ns:item").is_ok());
        assert!(validate_root_name("line-item.v2").is_ok());
        assert!(validate_root_name("*").is_ok());
    }

    #[test]
    fn test_validate_root_name_invalid() {
        assert!(validate_root_name("").is_err());
        assert!(validate_root_name("1item").is_err());
        assert!(validate_root_name("item/sub").is_err());
        assert!(validate_root_name("item[1]").is_err());
        assert!(validate_root_name("two words").is_err());
    }

    #[test]
    fn test_unix_timestamp() {
        let expected = chrono::Utc.with_ymd_and_hms(2013, 6, 21, 8, 4, 35).unwrap();
        assert_eq!(unix_timestamp("1371801875").unwrap(), Value::DateTime(expected));
        assert_eq!(unix_timestamp(" 1371801875\n").unwrap(), Value::DateTime(expected));
        assert!(unix_timestamp("yesterday").is_err());
        assert!(unix_timestamp("inf").is_err());
    }

    #[test]
    fn test_unix_timestamp_fraction() {
        let value = unix_timestamp("1.5").unwrap();
        let dt = value.as_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_builtin_converters() {
        let raw = builtin_converter("raw").unwrap();
        assert_eq!(raw("  x ").unwrap(), Value::from("  x "));

        let lower = builtin_converter("lowercase").unwrap();
        assert_eq!(lower(" Thing ").unwrap(), Value::from("thing"));

        let upper = builtin_converter("uppercase").unwrap();
        assert_eq!(upper("thing").unwrap(), Value::from("THING"));

        let normalize = builtin_converter("normalize_space").unwrap();
        assert_eq!(normalize("  a \n\t b  ").unwrap(), Value::from("a b"));

        assert!(builtin_converter("rot13").is_none());
        for name in BUILTIN_CONVERTERS {
            assert!(builtin_converter(name).is_some(), "{name}");
        }
    }

    const ITEM_SCHEMA: &str = r#"
name: Item
condition: "status='cancel'"
fields:
  item_id: { kind: string, selector: "id/text()" }
  level: { kind: integer, selector: "level/text()", optional: true }
  date: { kind: integer, selector: "date/text()", converter: unix_timestamp }
  tags:
    kind: node
    selector: "tags/tag"
    multiple: true
    schema:
      name: Tag
      fields:
        label: { kind: string, selector: "text()" }
"#;

    #[test]
    fn test_schema_config_from_yaml() {
        let config = SchemaConfig::from_yaml(ITEM_SCHEMA).unwrap();
        assert_eq!(config.name, "Item");
        assert_eq!(config.condition.as_deref(), Some("status='cancel'"));
        assert_eq!(
            config.fields.keys().collect::<Vec<_>>(),
            vec!["item_id", "level", "date", "tags"]
        );
        assert!(config.fields["level"].optional);
        assert_eq!(config.fields["date"].converter.as_deref(), Some("unix_timestamp"));
    }

    #[test]
    fn test_schema_config_into_schema() {
        let schema = SchemaConfig::from_yaml(ITEM_SCHEMA)
            .unwrap()
            .into_schema()
            .unwrap();
        assert_eq!(schema.root_name(), "item");
        assert_eq!(schema.condition(), Some("status='cancel'"));

        let names: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["item_id", "level", "date", "tags"]);

        let date = schema.field("date").unwrap().descriptor();
        assert!(date.has_converter());

        let tags = schema.field("tags").unwrap().descriptor();
        assert!(tags.is_multiple());
        assert_eq!(tags.nested_schema().unwrap().name(), "Tag");
    }

    #[test]
    fn test_schema_config_namespaces() {
        let yaml = r#"
name: Entry
root: "atom:entry"
namespaces:
  atom: "http://www.w3.org/2005/Atom"
fields:
  title: { kind: string, selector: "atom:title/text()" }
  author:
    kind: node
    selector: "atom:author"
    schema:
      name: Author
      fields:
        name: { kind: string, selector: "atom:name/text()" }
"#;
        let schema = SchemaConfig::from_yaml(yaml).unwrap().into_schema().unwrap();
        assert_eq!(schema.root_name(), "atom:entry");
        assert_eq!(
            schema.namespaces().uri("atom"),
            Some("http://www.w3.org/2005/Atom")
        );

        let author = schema.field("author").unwrap().descriptor();
        let nested = author.nested_schema().unwrap();
        assert_eq!(
            nested.namespaces().uri("atom"),
            Some("http://www.w3.org/2005/Atom")
        );
    }

    #[test]
    fn test_schema_config_local_names() {
        let yaml = r#"
name: Item
match_local_names: true
fields:
  id: { kind: string, selector: "any:id/text()" }
"#;
        let schema = SchemaConfig::from_yaml(yaml).unwrap().into_schema().unwrap();
        assert_eq!(schema.namespaces().matching(), NameMatching::LocalName);
    }

    #[test]
    fn test_unknown_converter_is_rejected() {
        let yaml = r#"
name: Item
fields:
  id: { kind: string, selector: "id/text()", converter: rot13 }
"#;
        let err = SchemaConfig::from_yaml(yaml)
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert!(matches!(err, MapXmlError::Configuration(_)));
        assert!(err.to_string().contains("unknown converter 'rot13'"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let yaml = r#"
name: Item
fields:
  id: { kind: string, selector: "id/text()", requried: true }
"#;
        assert!(matches!(
            SchemaConfig::from_yaml(yaml),
            Err(MapXmlError::Yaml(_))
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let yaml = r#"
name: Item
fields:
  id: { kind: decimal, selector: "id/text()" }
"#;
        assert!(SchemaConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item.yaml");
        std::fs::write(&path, ITEM_SCHEMA).unwrap();

        let config = SchemaConfig::from_file(&path).unwrap();
        assert_eq!(config.name, "Item");

        let missing = SchemaConfig::from_file(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(MapXmlError::Io(_))));
    }
}
