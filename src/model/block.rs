//! Block-level types: paragraphs, tables and inline image references.

use super::Table;
use serde::{Deserialize, Serialize};

/// A body-level content block, in physical document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// A paragraph (may carry embedded images)
    Paragraph(Paragraph),
    /// A table
    Table(Table),
}

impl Block {
    /// Get the paragraph if this block is one.
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        }
    }

    /// Get the table if this block is one.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        }
    }

    /// Plain text of the block.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.text.clone(),
            Block::Table(t) => t.plain_text(),
        }
    }
}

/// A paragraph of text with its declared style.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    /// Concatenated run text (tabs and breaks preserved)
    pub text: String,

    /// Display name of the paragraph style (e.g. "heading 2"), if any
    pub style: Option<String>,

    /// Images anchored in this paragraph, in run order
    pub images: Vec<ImageRef>,
}

impl Paragraph {
    /// Create a new empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with plain text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a paragraph carrying a style name.
    pub fn styled(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Some(style.into()),
            images: Vec::new(),
        }
    }

    /// Attach an image reference and return self.
    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.images.push(image);
        self
    }

    /// Text with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Check if the paragraph has no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Check if the paragraph anchors any image.
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Check if the paragraph is styled as the document title.
    ///
    /// Matches `Title` and the bare Chinese `标题`, not `标题 1` and friends.
    pub fn is_title_style(&self) -> bool {
        self.style.as_deref().is_some_and(is_title_style_name)
    }
}

/// Check if a style name denotes the document title style.
pub fn is_title_style_name(name: &str) -> bool {
    let name = name.trim();
    name.eq_ignore_ascii_case("title") || name == "标题"
}

/// Reference from a paragraph to an embedded picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Relationship id of the picture part (e.g. "rId7")
    pub rel_id: String,

    /// Package-relative target of the relationship (e.g. "media/image1.png")
    pub target: Option<String>,

    /// Drawing alt-text title
    pub title: Option<String>,

    /// Drawing alt-text description
    pub description: Option<String>,
}

impl ImageRef {
    /// Create a reference to a relationship id.
    pub fn new(rel_id: impl Into<String>) -> Self {
        Self {
            rel_id: rel_id.into(),
            ..Self::default()
        }
    }

    /// Set the relationship target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set alt-text title and description.
    pub fn with_alt_text(mut self, title: Option<String>, description: Option<String>) -> Self {
        self.title = title;
        self.description = description;
        self
    }

    /// Non-empty alt-text values, title first.
    pub fn alt_texts(&self) -> impl Iterator<Item = &str> {
        [self.title.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
