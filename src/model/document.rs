//! Document-level types.

use super::{Block, Paragraph, Resource, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed Word document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Body blocks in physical order
    pub blocks: Vec<Block>,

    /// Embedded media keyed by relationship id
    pub resources: HashMap<String, Resource>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a block list.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    /// Add a block to the document.
    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Add a paragraph to the document.
    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    /// Add a table to the document.
    pub fn add_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Add a resource to the document.
    pub fn add_resource(&mut self, id: String, resource: Resource) {
        self.resources.insert(id, resource);
    }

    /// Get a resource by relationship id.
    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Body-level paragraphs in order; the position is the paragraph ordinal.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(Block::as_paragraph)
    }

    /// Tables in order; the position is the table ordinal.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(Block::as_table)
    }

    /// Number of body-level paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.tables().count()
    }

    /// Number of image references in paragraphs and table cells.
    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => p.images.len(),
                Block::Table(t) => t.images.len(),
            })
            .sum()
    }

    /// Check if the document has any blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Text of the first paragraph styled as the document title.
    pub fn title_paragraph(&self) -> Option<&str> {
        self.paragraphs()
            .find(|p| p.is_title_style() && !p.is_empty())
            .map(|p| p.trimmed())
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Document metadata from `docProps/core.xml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Last editor
    pub last_modified_by: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Check whether any field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
            && self.last_modified_by.is_none()
            && self.created.is_none()
            && self.modified.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageRef;

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.paragraph_count(), 0);
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_counts() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::styled("仓库管理", "Title"));
        doc.add_paragraph(
            Paragraph::with_text("").with_image(ImageRef::new("rId5")).with_image(ImageRef::new("rId6")),
        );
        doc.add_table(Table::from_grid([vec!["a"]]));
        doc.add_paragraph(Paragraph::with_text("tail"));

        assert_eq!(doc.paragraph_count(), 3);
        assert_eq!(doc.table_count(), 1);
        assert_eq!(doc.image_count(), 2);
        assert_eq!(doc.title_paragraph(), Some("仓库管理"));
        assert_eq!(doc.plain_text(), "仓库管理\na\ntail");
    }
}
