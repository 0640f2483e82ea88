//! Schemas: ordered field descriptors plus root metadata.

use crate::config::validate_root_name;
use crate::document::root_query;
use crate::error::{MapXmlError, Result};
use crate::field::{FieldDescriptor, FieldKind};
use crate::xpath::{self, NameMatching, Namespaces, Selector};

/// Metadata controlling which nodes a schema is applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMeta {
    /// Element name of root nodes; defaults to the lowercased schema name.
    pub root: Option<String>,
    /// Predicate appended to the root query, e.g. `status='cancel'`.
    pub condition: Option<String>,
}

/// A named field with its compiled selector.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    descriptor: FieldDescriptor,
    selector: Selector,
}

impl Field {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// The compiled selector.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// A validated record type.
///
/// Built once with [`Schema::builder`] and immutable afterwards, so it can be
/// shared between engines and threads.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    meta: SchemaMeta,
    root_name: String,
    namespaces: Namespaces,
}

impl Schema {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn meta(&self) -> &SchemaMeta {
        &self.meta
    }

    /// Element name used to locate root nodes.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.meta.condition.as_deref()
    }

    /// Prefix bindings and name matching used by the root query and selectors.
    #[must_use]
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }
}

/// Builder for [`Schema`].
///
/// Problems are collected while building and reported together by
/// [`SchemaBuilder::build`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    meta: SchemaMeta,
    namespaces: Namespaces,
    problems: Vec<String>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            meta: SchemaMeta::default(),
            namespaces: Namespaces::new(),
            problems: Vec::new(),
        }
    }

    /// Declare a field. Declaration order is output order.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    /// Override the root element name.
    #[must_use]
    pub fn root(mut self, root: impl Into<String>) -> Self {
        let root = root.into();
        set_meta(&mut self.meta.root, root, "root", &mut self.problems);
        self
    }

    /// Restrict root nodes with a predicate.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        set_meta(
            &mut self.meta.condition,
            condition,
            "condition",
            &mut self.problems,
        );
        self
    }

    /// Bind a namespace prefix for the root name, condition and selectors.
    #[must_use]
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let (prefix, uri) = (prefix.into(), uri.into());
        let existing = self.namespaces.uri(&prefix).map(str::to_string);
        match existing {
            Some(existing) if existing != uri => self.problems.push(format!(
                "conflicting namespace '{prefix}' values '{existing}' and '{uri}'"
            )),
            _ => self.namespaces = self.namespaces.bind(prefix, uri),
        }
        self
    }

    /// Compare element and attribute names by local name, ignoring
    /// namespaces.
    #[must_use]
    pub fn match_local_names(mut self) -> Self {
        self.namespaces = self.namespaces.with_matching(NameMatching::LocalName);
        self
    }

    /// Apply a whole metadata block.
    #[must_use]
    pub fn meta(mut self, meta: SchemaMeta) -> Self {
        if let Some(root) = meta.root {
            self = self.root(root);
        }
        if let Some(condition) = meta.condition {
            self = self.condition(condition);
        }
        self
    }

    /// Validate the declaration and compile every selector.
    ///
    /// # Errors
    /// - `Configuration` for conflicting metadata, duplicate field names,
    ///   node fields without a nested schema, or an invalid root name
    /// - `InvalidSelector` when a selector or the root query does not compile
    pub fn build(self) -> Result<Schema> {
        let mut problems = self.problems;

        let mut seen = std::collections::HashSet::new();
        for (name, descriptor) in &self.fields {
            if !seen.insert(name.as_str()) {
                problems.push(format!("field '{name}' is declared more than once"));
            }
            if descriptor.kind() == FieldKind::Node && descriptor.nested_schema().is_none() {
                problems.push(format!(
                    "field '{name}' is a node field without a nested schema"
                ));
            }
        }

        let root_name = self
            .meta
            .root
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase());
        if validate_root_name(&root_name).is_err() {
            problems.push(format!("invalid root element name '{root_name}'"));
        }

        if !problems.is_empty() {
            return Err(MapXmlError::Configuration(format!(
                "schema '{}': {}",
                self.name,
                problems.join("; ")
            )));
        }

        let query = root_query(&root_name, self.meta.condition.as_deref());
        xpath::compile(&query, &self.namespaces).map_err(|source| {
            MapXmlError::InvalidSelector {
                selector: query.clone(),
                source,
            }
        })?;

        let fields = self
            .fields
            .into_iter()
            .map(|(name, descriptor)| {
                let selector = compile_selector(descriptor.selector(), &self.namespaces)?;
                Ok(Field {
                    name,
                    descriptor,
                    selector,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Schema {
            name: self.name,
            fields,
            meta: self.meta,
            root_name,
            namespaces: self.namespaces,
        })
    }
}

/// An empty selector addresses the context node itself.
fn compile_selector(selector: &str, namespaces: &Namespaces) -> Result<Selector> {
    let source = if selector.trim().is_empty() { "." } else { selector };
    xpath::compile(source, namespaces).map_err(|source| MapXmlError::InvalidSelector {
        selector: selector.to_string(),
        source,
    })
}

fn set_meta(slot: &mut Option<String>, value: String, key: &str, problems: &mut Vec<String>) {
    if let Some(existing) = slot.as_deref() {
        if existing != value {
            problems.push(format!("conflicting {key} values '{existing}' and '{value}'"));
        }
        return;
    }
    *slot = Some(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_schema() -> SchemaBuilder {
        Schema::builder("Item")
            .field("item_id", FieldDescriptor::string("id/text()"))
            .field("subaccount", FieldDescriptor::integer("subaccount/text()"))
            .field("level", FieldDescriptor::integer("level/text()").optional())
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let schema = item_schema().build().unwrap();
        let names: Vec<_> = schema.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["item_id", "subaccount", "level"]);
    }

    #[test]
    fn test_root_name_defaults_to_lowercased_name() {
        let schema = item_schema().build().unwrap();
        assert_eq!(schema.root_name(), "item");
        assert_eq!(schema.meta(), &SchemaMeta::default());
        assert!(schema.condition().is_none());
    }

    #[test]
    fn test_meta_overrides_root_and_condition() {
        let schema = item_schema()
            .root("entry")
            .condition("status='cancel'")
            .build()
            .unwrap();
        assert_eq!(schema.root_name(), "entry");
        assert_eq!(schema.condition(), Some("status='cancel'"));
        assert!(schema.field("root").is_none());
    }

    #[test]
    fn test_meta_block() {
        let schema = item_schema()
            .meta(SchemaMeta {
                root: Some("entry".to_string()),
                condition: None,
            })
            .build()
            .unwrap();
        assert_eq!(schema.root_name(), "entry");
    }

    #[test]
    fn test_identical_meta_repeat_is_accepted() {
        let schema = item_schema().root("entry").root("entry").build().unwrap();
        assert_eq!(schema.root_name(), "entry");
    }

    #[test]
    fn test_conflicting_meta_is_rejected() {
        let err = item_schema().root("entry").root("other").build().unwrap_err();
        assert!(matches!(err, MapXmlError::Configuration(_)));
        assert!(err.to_string().contains("conflicting root"));

        let err = item_schema()
            .condition("a=1")
            .condition("a=2")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("conflicting condition"));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let err = item_schema()
            .field("level", FieldDescriptor::string("other/text()"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'level' is declared more than once"));
    }

    #[test]
    fn test_node_field_requires_nested_schema() {
        let err = Schema::builder("Item")
            .field("tags", FieldDescriptor::new(FieldKind::Node, "tags/tag"))
            .build()
            .unwrap_err();
        assert!(matches!(err, MapXmlError::Configuration(_)));
        assert!(err.to_string().contains("without a nested schema"));
    }

    #[test]
    fn test_invalid_root_name_is_rejected() {
        let err = item_schema().root("not a name").build().unwrap_err();
        assert!(matches!(err, MapXmlError::Configuration(_)));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let err = Schema::builder("Item")
            .field("broken", FieldDescriptor::string("id[text()"))
            .build()
            .unwrap_err();
        match err {
            MapXmlError::InvalidSelector { selector, .. } => assert_eq!(selector, "id[text()"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_condition_is_rejected() {
        let err = item_schema().condition("status=").build().unwrap_err();
        match err {
            MapXmlError::InvalidSelector { selector, .. } => {
                assert_eq!(selector, "//item[status=]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_namespace_bindings() {
        let schema = item_schema()
            .namespace("x", "urn:x")
            .namespace("x", "urn:x")
            .root("x:item")
            .build()
            .unwrap();
        assert_eq!(schema.namespaces().uri("x"), Some("urn:x"));
        assert_eq!(schema.namespaces().matching(), NameMatching::Qualified);

        let err = item_schema()
            .namespace("x", "urn:x")
            .namespace("x", "urn:y")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("conflicting namespace 'x'"));
    }

    #[test]
    fn test_unbound_prefix_is_rejected() {
        let err = item_schema().root("x:item").build().unwrap_err();
        match err {
            MapXmlError::InvalidSelector { selector, source } => {
                assert_eq!(selector, "//x:item");
                assert!(source.to_string().contains("undefined namespace prefix 'x'"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let schema = item_schema().root("x:item").match_local_names().build().unwrap();
        assert_eq!(schema.namespaces().matching(), NameMatching::LocalName);
    }

    #[test]
    fn test_nested_schema_is_shared() {
        let tag = Schema::builder("Tag")
            .field("label", FieldDescriptor::string("text()"))
            .build()
            .unwrap();
        let schema = Schema::builder("Item")
            .field("tags", FieldDescriptor::node("tags/tag", tag).multiple())
            .build()
            .unwrap();
        let nested = schema.fields()[0].descriptor().nested_schema().unwrap();
        assert_eq!(nested.name(), "Tag");
    }
}
