//! MapXml - Declarative mapping of XML and HTML documents into records.
//!
//! A [`Schema`] declares named fields, each with a selector (a path
//! expression evaluated relative to a root node) and a kind that says how the
//! matched text becomes a [`Value`]. The [`MapXml`] engine finds every root
//! node of a document and maps it into a [`Record`]; nodes missing a required
//! field are left out.
//!
//! Selectors are XPath 1.0 expressions evaluated by `xmloxide`. Element names
//! are namespace-aware: bind prefixes with [`SchemaBuilder::namespace`], or
//! opt into local-name matching with [`SchemaBuilder::match_local_names`].
//!
//! # Example
//!
//! ```
//! use mapxml::{FieldDescriptor, MapXml, Schema, Value};
//!
//! let schema = Schema::builder("Product")
//!     .root("div")
//!     .condition("@class='product'")
//!     .field("price", FieldDescriptor::integer("span[@class='price']/text()"))
//!     .field("brand", FieldDescriptor::string("label[@id='brand']/text()"))
//!     .build()
//!     .unwrap();
//!
//! let mut engine = MapXml::html();
//! engine.load(r#"<div class="product"><span class="price">1000</span><label id="brand">Thing</label></div>"#);
//! let records = engine.map(&schema).unwrap();
//!
//! assert_eq!(records[0]["price"], Value::Integer(1000));
//! assert_eq!(records[0]["brand"], Value::from("Thing"));
//! ```
//!
//! # Architecture
//!
//! - [`field`]: Field descriptors, kinds and value conversion
//! - [`schema`]: Schema builder and validation
//! - [`types`]: Output values and records
//! - [`error`]: Error types and Result alias
//! - [`xml`]: XML and HTML parsing through `xmloxide`
//! - [`xpath`]: Selector compilation with namespace-qualified name tests
//! - [`document`]: Root-node lookup and selector evaluation
//! - [`mapper`]: Recursive node-to-record mapping
//! - [`engine`]: Document loading and mapping entry point
//! - [`config`]: Validation, built-in converters and YAML schema files
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod field;
pub mod mapper;
pub mod schema;
pub mod types;
pub mod xml;
pub mod xpath;

// Re-export commonly used items
pub use config::SchemaConfig;
pub use document::Match;
pub use engine::{MapOptions, MapXml};
pub use error::{ConversionError, MapXmlError, Result};
pub use field::{Converter, FieldDescriptor, FieldKind};
pub use mapper::NestedAbsence;
pub use schema::{Field, Schema, SchemaBuilder, SchemaMeta};
pub use types::{Record, Value};
pub use xml::DocumentMode;
pub use xpath::{NameMatching, Namespaces, Selector};
