//! Error types for sopchunk library.

use std::io;
use thiserror::Error;

/// Result type alias for sopchunk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading and chunking documents.
///
/// Structural ambiguity inside a well-formed document is never an error;
/// these variants cover unreadable input and failed output only.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as a Word package.
    #[error("Unknown file format: not a valid .docx package")]
    UnknownFormat,

    /// The file is a recognised but unsupported format (e.g. legacy `.doc`).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The ZIP container is damaged.
    #[error("Corrupted package: {0}")]
    Zip(String),

    /// A package part contains malformed XML.
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// A required package part is missing.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Error writing CSV output.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Error during rendering (CSV, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Invalid configuration (rule files, options).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document produced no chunks at all.
    #[error("No chunks generated for {0}")]
    NoChunks(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::FileNotFound => Error::MissingPart(err.to_string()),
            _ => Error::Zip(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Error::Io(e),
            other => Error::Csv(format!("{:?}", other)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Render(format!("JSON error: {}", err))
    }
}
