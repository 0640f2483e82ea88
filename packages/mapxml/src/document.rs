//! Document adapter: root-node lookup and selector evaluation.

use xmloxide::tree::NodeKind;
use xmloxide::xpath::types::format_xpath_number;
use xmloxide::xpath::{XPathContext, XPathError, XPathValue};
use xmloxide::{Document, NodeId};

use crate::error::{MapXmlError, Result};
use crate::xpath::{self, Namespaces, Selector};

/// One result of evaluating a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// An element that can be mapped further.
    Node(NodeId),
    /// Text: a text, comment or processing-instruction node, an attribute
    /// value, or a scalar expression result.
    Text(String),
}

impl Match {
    /// The text a scalar field converts: the string-value of a node match.
    #[must_use]
    pub fn raw_text(&self, doc: &Document) -> String {
        match self {
            Match::Node(id) => doc.text_content(*id),
            Match::Text(text) => text.clone(),
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Match::Node(id) => Some(*id),
            Match::Text(_) => None,
        }
    }
}

/// Build the query locating root nodes.
///
/// The condition is inserted verbatim as a predicate.
#[must_use]
pub fn root_query(root_name: &str, condition: Option<&str>) -> String {
    match condition {
        Some(condition) => format!("//{root_name}[{condition}]"),
        None => format!("//{root_name}"),
    }
}

/// Find all root nodes named `root_name` that satisfy `condition`, in
/// document order.
///
/// # Errors
/// Returns `InvalidSelector` if the composed query does not compile or fails
/// to evaluate.
pub fn find_root_nodes(
    doc: &Document,
    root_name: &str,
    condition: Option<&str>,
    namespaces: &Namespaces,
) -> Result<Vec<NodeId>> {
    let query = root_query(root_name, condition);
    let invalid = |source: XPathError| MapXmlError::InvalidSelector {
        selector: query.clone(),
        source,
    };

    let selector = xpath::compile(&query, namespaces).map_err(invalid)?;
    let nodes: Vec<NodeId> = evaluate(doc, doc.root(), &selector)
        .map_err(invalid)?
        .iter()
        .filter_map(Match::as_node)
        .collect();

    tracing::debug!(query = %query, count = nodes.len(), "Located root nodes");
    Ok(nodes)
}

/// Evaluate a compiled selector with `node` as context.
///
/// Always returns a list; an empty list means nothing matched. Scalar results
/// become a single text match, except the empty string, which counts as no
/// match.
///
/// # Errors
/// Returns `XPathError` when evaluation fails (e.g. an unknown function).
pub fn evaluate(
    doc: &Document,
    node: NodeId,
    selector: &Selector,
) -> std::result::Result<Vec<Match>, XPathError> {
    let value = XPathContext::new(doc, node).evaluate(selector.expr())?;

    if selector.selects_attributes() {
        let XPathValue::NodeSet(elements) = value else {
            return Ok(Vec::new());
        };
        return Ok(elements
            .into_iter()
            .flat_map(|id| selector.attribute_values(doc, id))
            .map(Match::Text)
            .collect());
    }

    let matches = match value {
        XPathValue::NodeSet(nodes) => nodes.into_iter().map(|id| node_match(doc, id)).collect(),
        XPathValue::String(s) if s.is_empty() => Vec::new(),
        XPathValue::String(s) => vec![Match::Text(s)],
        XPathValue::Number(n) => vec![Match::Text(format_xpath_number(n))],
        XPathValue::Boolean(b) => vec![Match::Text(b.to_string())],
    };
    Ok(matches)
}

fn node_match(doc: &Document, id: NodeId) -> Match {
    match doc.node(id).kind {
        NodeKind::Element { .. } | NodeKind::Document => Match::Node(id),
        _ => Match::Text(
            doc.node_text(id)
                .map_or_else(|| doc.text_content(id), str::to_string),
        ),
    }
}
