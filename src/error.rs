//! Error types for folio conversions.

use thiserror::Error;

/// Errors that can occur while converting a document.
///
/// Every variant is fatal to the conversion in progress; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed source document: {0}")]
    MalformedSource(String),

    #[error("Unknown element <{0}> found")]
    UnknownConstruct(String),

    #[error("Element <{element}> requires a non-empty \"{attribute}\" attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("Cannot use {construct} inside {context}")]
    StructuralGrammar {
        construct: &'static str,
        context: &'static str,
    },

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },
}

impl Error {
    pub(crate) fn grammar(construct: &'static str, context: &'static str) -> Self {
        Error::StructuralGrammar { construct, context }
    }

    pub(crate) fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
