//! Front ends that turn document text into an `xmloxide` [`Document`].

use xmloxide::html::parse_html;
use xmloxide::Document;

use crate::error::{MapXmlError, Result};

/// How document text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentMode {
    /// Well-formed XML; malformed input is a parse error.
    #[default]
    Xml,
    /// Forgiving HTML parsing (tag soup is repaired, names lowercased).
    Html,
}

impl DocumentMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Html => "html",
        }
    }
}

/// Parse document text in the given mode.
///
/// XML keeps namespace prefixes and URIs on every element. HTML elements
/// carry no namespace.
///
/// # Errors
/// Returns `XmlParse` for malformed XML and `Parse` for an empty HTML
/// document.
///
/// # Examples
/// ```
/// use mapxml::xml::{parse_document, DocumentMode};
///
/// let doc = parse_document("<root><child/></root>", DocumentMode::Xml).unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// ```
pub fn parse_document(text: &str, mode: DocumentMode) -> Result<Document> {
    let doc = match mode {
        DocumentMode::Xml => Document::parse_str(text)?,
        DocumentMode::Html => {
            if text.trim().is_empty() {
                return Err(MapXmlError::Parse("Document is empty".to_string()));
            }
            parse_html(text).map_err(|e| MapXmlError::Parse(e.to_string()))?
        }
    };
    tracing::debug!(mode = mode.as_str(), nodes = doc.node_count(), "Parsed document");
    Ok(doc)
}
