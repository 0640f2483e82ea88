//! Mapping engine: owns a document and maps it with schemas.

use std::cell::OnceCell;
use std::path::Path;

use crate::document::find_root_nodes;
use crate::error::{MapXmlError, Result};
use crate::mapper::{map_node, NestedAbsence};
use crate::schema::Schema;
use crate::types::Record;
use crate::xml::{parse_document, DocumentMode};
use xmloxide::Document;

/// Options fixed when an engine is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapOptions {
    pub mode: DocumentMode,
    pub nested_absence: NestedAbsence,
}

impl MapOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: DocumentMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_nested_absence(mut self, nested_absence: NestedAbsence) -> Self {
        self.nested_absence = nested_absence;
        self
    }
}

/// Engine that maps a loaded document into records.
///
/// The document is parsed on the first [`MapXml::map`] call and the parsed
/// document is reused by later calls until [`MapXml::load`] replaces the text.
///
/// ```
/// use mapxml::{FieldDescriptor, MapXml, Schema, Value};
///
/// let schema = Schema::builder("Item")
///     .field("id", FieldDescriptor::string("id/text()"))
///     .field("level", FieldDescriptor::integer("level/text()").optional())
///     .build()
///     .unwrap();
///
/// let mut engine = MapXml::new();
/// engine.load("<items><item><id>a</id></item><item/></items>");
/// let records = engine.map(&schema).unwrap();
///
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0]["id"], Value::from("a"));
/// assert_eq!(records[0]["level"], Value::Null);
/// ```
#[derive(Debug, Default)]
pub struct MapXml {
    options: MapOptions,
    text: Option<String>,
    document: OnceCell<Document>,
}

impl MapXml {
    /// Create an engine for XML documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine for HTML documents.
    #[must_use]
    pub fn html() -> Self {
        Self::with_options(MapOptions::default().with_mode(DocumentMode::Html))
    }

    #[must_use]
    pub fn with_options(options: MapOptions) -> Self {
        Self {
            options,
            text: None,
            document: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> MapOptions {
        self.options
    }

    /// Store document text, discarding any previously parsed document.
    pub fn load(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
        self.document = OnceCell::new();
    }

    /// Read document text from a file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.load(text);
        Ok(())
    }

    fn document(&self) -> Result<&Document> {
        if let Some(doc) = self.document.get() {
            return Ok(doc);
        }
        let text = self
            .text
            .as_deref()
            .ok_or_else(|| MapXmlError::Parse("no document loaded".to_string()))?;
        let doc = parse_document(text, self.options.mode)?;
        Ok(self.document.get_or_init(|| doc))
    }

    /// Map every root node of the loaded document with `schema`.
    ///
    /// Nodes that do not satisfy the schema are left out; the survivors are
    /// returned in document order.
    ///
    /// # Errors
    /// - `Parse`/`XmlParse` if nothing is loaded or the document is malformed
    /// - `Conversion` if a matched value cannot be converted
    /// - `InvalidSelector` if a selector fails to evaluate
    pub fn map(&self, schema: &Schema) -> Result<Vec<Record>> {
        let doc = self.document()?;
        let roots = find_root_nodes(
            doc,
            schema.root_name(),
            schema.condition(),
            schema.namespaces(),
        )?;

        let mut records = Vec::with_capacity(roots.len());
        for node in &roots {
            if let Some(record) = map_node(doc, *node, schema, self.options.nested_absence)? {
                records.push(record);
            }
        }

        tracing::debug!(
            schema = %schema.name(),
            mapped = records.len(),
            discarded = roots.len() - records.len(),
            "Mapped document"
        );
        Ok(records)
    }
}
