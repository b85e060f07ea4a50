//! Word (`.docx`) package parsing module.

mod body;
mod docx_parser;
mod options;
mod xml;

pub use docx_parser::DocxParser;
pub use options::{ErrorMode, ParseOptions};
pub use xml::Relationship;
