//! Document model types for Word content representation.
//!
//! This module defines the intermediate representation that bridges
//! package reading and structure inference: a flat, document-ordered
//! stream of paragraph and table blocks plus the embedded media they
//! reference.

mod block;
mod document;
mod identity;
mod resource;
mod table;

pub use block::{is_title_style_name, Block, ImageRef, Paragraph};
pub use document::{Document, Metadata};
pub use identity::SopIdentity;
pub use resource::{Resource, ResourceType};
pub use table::{Table, TableCell, TableRow};
