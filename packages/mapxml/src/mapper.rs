//! Node mapper: turns one node into a record using a schema.

use crate::document::{evaluate, Match};
use crate::error::{MapXmlError, Result};
use crate::field::FieldKind;
use crate::schema::{Field, Schema};
use crate::types::{Record, Value};
use xmloxide::{Document, NodeId};

/// What happens when a nested record is discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NestedAbsence {
    /// Store `Value::Null` in place of the nested record.
    #[default]
    Keep,
    /// Discard the parent record too.
    Cascade,
}

/// Map `node` with `schema`.
///
/// Returns `Ok(None)` when the node does not satisfy the schema: a required
/// field matched nothing (or, with [`NestedAbsence::Cascade`], a nested record
/// was discarded). Fields after the first missing one are not evaluated.
///
/// # Errors
/// - `Conversion` when matched text cannot be converted
/// - `InvalidSelector` when a selector fails to evaluate
/// - `Configuration` when a node field selects text instead of nodes
pub fn map_node(
    doc: &Document,
    node: NodeId,
    schema: &Schema,
    policy: NestedAbsence,
) -> Result<Option<Record>> {
    let mut record = Record::new();

    for field in schema.fields() {
        let descriptor = field.descriptor();
        let matches = evaluate(doc, node, field.selector()).map_err(|source| {
            MapXmlError::InvalidSelector {
                selector: descriptor.selector().to_string(),
                source,
            }
        })?;

        if matches.is_empty() {
            if descriptor.is_optional() {
                record.insert(field.name(), Value::Null);
                continue;
            }
            return Ok(None);
        }

        let value = if descriptor.is_multiple() {
            let mut items = Vec::with_capacity(matches.len());
            for m in &matches {
                match map_match(doc, field, m, policy)? {
                    Some(value) => items.push(value),
                    None => return Ok(None),
                }
            }
            Value::List(items)
        } else {
            match map_match(doc, field, &matches[0], policy)? {
                Some(value) => value,
                None => return Ok(None),
            }
        };

        record.insert(field.name(), value);
    }

    Ok(Some(record))
}

/// Map one match of `field`. `None` means the parent record is discarded.
fn map_match(doc: &Document, field: &Field, m: &Match, policy: NestedAbsence) -> Result<Option<Value>> {
    let descriptor = field.descriptor();

    match descriptor.kind() {
        FieldKind::String
        | FieldKind::Text
        | FieldKind::Integer
        | FieldKind::Float
        | FieldKind::Boolean => descriptor
            .convert(&m.raw_text(doc))
            .map(Some)
            .map_err(|source| MapXmlError::Conversion {
                field: field.name().to_string(),
                source,
            }),
        FieldKind::Node => map_nested(doc, field, m, policy),
    }
}

/// Map a node field's match with its nested schema.
fn map_nested(doc: &Document, field: &Field, m: &Match, policy: NestedAbsence) -> Result<Option<Value>> {
    let nested = field.descriptor().nested_schema().ok_or_else(|| {
        MapXmlError::Configuration(format!(
            "field '{}' is a node field without a nested schema",
            field.name()
        ))
    })?;
    let Some(child) = m.as_node() else {
        return Err(MapXmlError::Configuration(format!(
            "node field '{}' selected text; its selector must select elements",
            field.name()
        )));
    };

    match map_node(doc, child, nested, policy)? {
        Some(record) => Ok(Some(Value::Record(record))),
        None => match policy {
            NestedAbsence::Keep => Ok(Some(Value::Null)),
            NestedAbsence::Cascade => Ok(None),
        },
    }
}
