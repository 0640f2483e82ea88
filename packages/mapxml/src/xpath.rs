//! Selector compilation on top of the `xmloxide` XPath 1.0 engine.
//!
//! Expressions are parsed once by `xmloxide` and then qualified against a
//! [`Namespaces`] scope. XPath name tests carry namespaces: an unprefixed
//! element name only matches elements in no namespace, and a prefixed name
//! matches elements whose namespace URI is bound to that prefix. The
//! rewritten tree adds a `namespace-uri()` predicate in front of the step's
//! own predicates, so positional predicates still count qualified matches
//! only.
//!
//! A trailing attribute step (`item/@id`) is kept apart from the compiled
//! path and resolved by [`Selector::attribute_values`], which returns every
//! matching attribute in document order.
//!
//! ```
//! use mapxml::xpath::{compile, Namespaces};
//!
//! let ns = Namespaces::new().bind("x", "urn:x");
//! assert!(compile("x:item/x:id/text()", &ns).is_ok());
//! assert!(compile("y:item", &ns).is_err());
//! ```

use std::collections::BTreeMap;

use xmloxide::tree::NodeKind;
use xmloxide::xpath::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use xmloxide::xpath::parser;
use xmloxide::{Attribute, Document, NodeId};

pub use xmloxide::xpath::XPathError;

/// The `xml` prefix is bound in every scope.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// How element and attribute names in selectors are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMatching {
    /// Names match on namespace URI and local name.
    #[default]
    Qualified,
    /// Names match on local name only; prefixes in selectors are ignored.
    LocalName,
}

/// Prefix bindings and the name matching mode used to compile selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    bindings: BTreeMap<String, String>,
    matching: NameMatching,
}

impl Namespaces {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to a namespace URI.
    #[must_use]
    pub fn bind(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.bindings.insert(prefix.into(), uri.into());
        self
    }

    #[must_use]
    pub fn with_matching(mut self, matching: NameMatching) -> Self {
        self.matching = matching;
        self
    }

    #[must_use]
    pub fn matching(&self) -> NameMatching {
        self.matching
    }

    #[must_use]
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    fn resolve(&self, prefix: &str) -> Result<&str, XPathError> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        self.uri(prefix)
            .ok_or_else(|| XPathError::InvalidExpression {
                message: format!("undefined namespace prefix '{prefix}'"),
            })
    }
}

/// Attribute name test of a trailing `@name` step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeTest {
    /// `@*` or `@node()`.
    Any,
    /// `@name`, `@p:name`; `namespace` is `None` for unprefixed names.
    Name {
        local: String,
        namespace: Option<String>,
    },
    /// `@p:*`.
    Namespace(String),
}

/// A compiled, namespace-qualified selector.
#[derive(Debug, Clone)]
pub struct Selector {
    expr: Expr,
    attribute: Option<AttributeTest>,
    matching: NameMatching,
}

impl Selector {
    /// The compiled expression. For selectors ending in an attribute step
    /// this addresses the elements that carry the attribute.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Whether the selector ends in an attribute step.
    #[must_use]
    pub fn selects_attributes(&self) -> bool {
        self.attribute.is_some()
    }

    /// Values of the trailing attribute step on `element`.
    ///
    /// Namespace declarations are not attributes and never match.
    #[must_use]
    pub fn attribute_values(&self, doc: &Document, element: NodeId) -> Vec<String> {
        let Some(test) = &self.attribute else {
            return Vec::new();
        };
        if !matches!(doc.node(element).kind, NodeKind::Element { .. }) {
            return Vec::new();
        }
        doc.attributes(element)
            .iter()
            .filter(|attr| !is_namespace_declaration(attr))
            .filter(|attr| self.attribute_matches(test, attr))
            .map(|attr| attr.value.clone())
            .collect()
    }

    fn attribute_matches(&self, test: &AttributeTest, attr: &Attribute) -> bool {
        match (test, self.matching) {
            (AttributeTest::Any, _) => true,
            (AttributeTest::Name { local, .. }, NameMatching::LocalName) => attr.name == *local,
            (AttributeTest::Name { local, namespace }, NameMatching::Qualified) => {
                attr.name == *local && attr.namespace.as_deref() == namespace.as_deref()
            }
            (AttributeTest::Namespace(_), NameMatching::LocalName) => true,
            (AttributeTest::Namespace(uri), NameMatching::Qualified) => {
                attr.namespace.as_deref() == Some(uri.as_str())
            }
        }
    }
}

/// Parse and qualify an expression once for repeated evaluation.
///
/// # Errors
/// Returns `XPathError` for syntax errors and for prefixes that have no
/// binding in `namespaces`.
pub fn compile(expression: &str, namespaces: &Namespaces) -> Result<Selector, XPathError> {
    let mut expr = parser::parse(expression)?;
    let attribute = split_attribute_step(&mut expr, namespaces)?;
    qualify(&mut expr, namespaces)?;
    Ok(Selector {
        expr,
        attribute,
        matching: namespaces.matching,
    })
}

/// Detach a trailing predicate-free attribute step from a location path.
fn split_attribute_step(
    expr: &mut Expr,
    namespaces: &Namespaces,
) -> Result<Option<AttributeTest>, XPathError> {
    let steps = match expr {
        Expr::Path { steps } | Expr::RootPath { steps } => steps,
        _ => return Ok(None),
    };
    let is_attribute_tail = steps
        .last()
        .is_some_and(|step| step.axis == Axis::Attribute && step.predicates.is_empty());
    if !is_attribute_tail {
        return Ok(None);
    }
    let Some(step) = steps.pop() else {
        return Ok(None);
    };

    let test = match step.node_test {
        NodeTest::Wildcard | NodeTest::Node => AttributeTest::Any,
        NodeTest::Name(name) => match split_qname(&name) {
            Some((prefix, local)) => AttributeTest::Name {
                local: local.to_string(),
                namespace: qualified_uri(prefix, namespaces)?,
            },
            None => AttributeTest::Name {
                local: name,
                namespace: None,
            },
        },
        NodeTest::PrefixWildcard(prefix) => match qualified_uri(&prefix, namespaces)? {
            Some(uri) => AttributeTest::Namespace(uri),
            None => AttributeTest::Any,
        },
        // text(), comment() and processing-instruction() never match attributes
        other => {
            steps.push(Step {
                axis: Axis::Attribute,
                node_test: other,
                predicates: Vec::new(),
            });
            return Ok(None);
        }
    };
    Ok(Some(test))
}

/// The URI bound to `prefix`, or `None` when names match locally.
fn qualified_uri(prefix: &str, namespaces: &Namespaces) -> Result<Option<String>, XPathError> {
    match namespaces.matching {
        NameMatching::Qualified => namespaces.resolve(prefix).map(|uri| Some(uri.to_string())),
        NameMatching::LocalName => Ok(None),
    }
}

/// Rewrite element name tests so they compare namespaces.
fn qualify(expr: &mut Expr, namespaces: &Namespaces) -> Result<(), XPathError> {
    match expr {
        Expr::Number(_) | Expr::String(_) | Expr::Variable(_) => Ok(()),
        Expr::BinaryOp { left, right, .. } | Expr::Union(left, right) => {
            qualify(left, namespaces)?;
            qualify(right, namespaces)
        }
        Expr::UnaryNeg(inner) => qualify(inner, namespaces),
        Expr::FunctionCall { args, .. } => args
            .iter_mut()
            .try_for_each(|arg| qualify(arg, namespaces)),
        Expr::Path { steps } | Expr::RootPath { steps } => steps
            .iter_mut()
            .try_for_each(|step| qualify_step(step, namespaces)),
        Expr::Filter { expr, predicates } => {
            qualify(expr, namespaces)?;
            predicates
                .iter_mut()
                .try_for_each(|predicate| qualify(predicate, namespaces))
        }
    }
}

fn qualify_step(step: &mut Step, namespaces: &Namespaces) -> Result<(), XPathError> {
    for predicate in &mut step.predicates {
        qualify(predicate, namespaces)?;
    }

    let (test, namespace) = match &step.node_test {
        NodeTest::Name(name) => match split_qname(name) {
            Some((prefix, local)) => (
                NodeTest::Name(local.to_string()),
                qualified_uri(prefix, namespaces)?,
            ),
            None => (NodeTest::Name(name.clone()), Some(String::new())),
        },
        NodeTest::PrefixWildcard(prefix) => (NodeTest::Wildcard, qualified_uri(prefix, namespaces)?),
        _ => return Ok(()),
    };
    step.node_test = test;

    // Attribute names inside predicates compare by local name.
    if step.axis == Axis::Attribute || step.axis == Axis::Namespace {
        return Ok(());
    }
    if let (NameMatching::Qualified, Some(uri)) = (namespaces.matching, namespace) {
        step.predicates.insert(0, namespace_predicate(uri));
    }
    Ok(())
}

/// `namespace-uri() = 'uri'`
fn namespace_predicate(uri: String) -> Expr {
    Expr::BinaryOp {
        op: BinaryOp::Eq,
        left: Box::new(Expr::FunctionCall {
            name: "namespace-uri".to_string(),
            args: Vec::new(),
        }),
        right: Box::new(Expr::String(uri)),
    }
}

fn split_qname(name: &str) -> Option<(&str, &str)> {
    name.split_once(':')
}

fn is_namespace_declaration(attr: &Attribute) -> bool {
    match attr.prefix.as_deref() {
        Some(prefix) => prefix == "xmlns",
        None => attr.name == "xmlns",
    }
}
