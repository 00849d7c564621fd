//! DataSeer Parser - Structured document reading
//!
//! Turns a TEI XML document (as produced by GROBID or Pub2TEI) into the
//! section / paragraph arena used by the annotation pipeline. Paragraph
//! content is kept as serialized inner markup so that inline elements
//! (`<ref>`, `<formula>`) survive sentence segmentation.

use dataseer_core::DataseerError;
use thiserror::Error;

pub mod tei;
pub mod xml;

pub use tei::TeiParser;
pub use xml::{fragment_text, is_well_formed, normalize_whitespace};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum ParserError {
    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Input is not well-formed XML
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// Root element is not `TEI`
    #[error("Not a TEI document: root element is <{0}>")]
    NotTei(String),

    /// TEI document without a `text` element
    #[error("TEI document has no <text> element")]
    MissingText,

    /// Arena construction failed
    #[error("Document construction failed: {0}")]
    Construction(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for DataseerError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::IoError { .. } => DataseerError::Other(anyhow::Error::new(err)),
            other => DataseerError::MalformedDocument(other.to_string()),
        }
    }
}

impl From<DataseerError> for ParserError {
    fn from(err: DataseerError) -> Self {
        ParserError::Construction(err.to_string())
    }
}
