//! Structure inference: from a flat block stream to sectioned chunks.
//!
//! The pipeline runs in fixed steps over one [`Document`]:
//!
//! 1. images are extracted and their captions searched ([`ImageExtractor`]);
//! 2. a positional pre-pass records the section open at every paragraph and
//!    table ([`PositionIndex`]);
//! 3. a single pass classifies headings, numbers them and emits chunks, with
//!    tables located by [`TableLocator`];
//! 4. images are bound into chunks ([`ImageBinder`]) and duplicated captions
//!    removed;
//! 5. the nested [`Outline`] is assembled for the JSON output.
//!
//! All state lives in values created for that one document, so separate
//! documents may be processed on separate threads.

mod binder;
mod builder;
mod classifier;
mod images;
mod numbering;
mod options;
mod rules;
mod tables;
mod tracker;
mod tree;

pub use binder::{clean_caption, image_block, BindRule, CaptionDedup, ImageBinder};
pub use classifier::HeadingClassifier;
pub use images::{ImageExtractor, ImageRecord};
pub use numbering::{format_number, NumberedHeading, SectionNumbering};
pub use options::{Labels, ProcessOptions, DEFAULT_IMAGE_DIR};
pub use rules::{ImageBand, ImageRule, RuleSet, TableRule};
pub use tables::{parse_pipe_table, render_pipe_table, LocatedTable, TableLocator};
pub use tracker::{path_leaf, HeadingTracker, OpenHeading, PositionIndex, PATH_SEPARATOR};
pub use tree::{FlatRecord, HeadingNode, Outline};

use crate::model::{Document, SopIdentity};
use crate::render::ProcessingStats;
use builder::OutlineBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of emitted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Heading text and the paragraphs under it
    Section,
    /// One table rendered as a pipe table
    Table,
}

/// One retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Merged text, image blocks included
    pub text: String,

    /// Breadcrumb of heading titles
    pub section_path: String,

    /// Section or table chunk
    pub kind: ChunkKind,

    /// Image files bound to this chunk
    pub images: Vec<String>,

    /// Outline node that produced the chunk
    #[serde(skip)]
    pub(crate) node: Option<usize>,
}

impl Chunk {
    /// Create a section chunk.
    pub fn section(text: String, section_path: String, node: Option<usize>) -> Self {
        Self {
            text,
            section_path,
            kind: ChunkKind::Section,
            images: Vec::new(),
            node,
        }
    }

    /// Create a table chunk.
    pub fn table(text: String, section_path: String, node: Option<usize>) -> Self {
        Self {
            kind: ChunkKind::Table,
            ..Self::section(text, section_path, node)
        }
    }

    /// Check if this chunk holds a table.
    pub fn is_table(&self) -> bool {
        self.kind == ChunkKind::Table
    }

    /// Image file names joined for a single CSV cell.
    pub fn image_list(&self) -> String {
        self.images.join(",")
    }
}

/// Everything the inference core produces for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSet {
    /// SOP identity from the file name
    pub identity: SopIdentity,

    /// Chunks in document order
    pub chunks: Vec<Chunk>,

    /// Extracted images with their bindings
    pub images: Vec<ImageRecord>,

    /// Nested outline
    pub outline: Outline,

    /// Statistics
    pub stats: ProcessingStats,
}

impl ChunkSet {
    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if no chunk was produced.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.text.as_str())
    }

    /// Chunks belonging to a section path.
    pub fn in_section<'s>(&'s self, section_path: &'s str) -> impl Iterator<Item = &'s Chunk> {
        self.chunks
            .iter()
            .filter(move |c| c.section_path == section_path)
    }

    /// Images not placed in any chunk; empty after a normal run.
    pub fn unbound_images(&self) -> Vec<&ImageRecord> {
        self.images.iter().filter(|r| !r.used).collect()
    }
}

/// Run the inference core over a parsed document.
///
/// `stem` is the source file stem; it names the SOP and prefixes image
/// file names. No I/O happens here.
pub fn chunk_document(document: &Document, stem: &str, options: &ProcessOptions) -> ChunkSet {
    let identity = SopIdentity::from_stem(stem, &options.labels.unknown_id);
    let classifier = HeadingClassifier::new(&options.rules, options.max_heading_depth);

    let mut images = ImageExtractor::new(&classifier, options.caption_window, options.caption_max_len)
        .extract(document, stem);
    let captions: HashSet<String> = images
        .iter()
        .map(|r| r.caption.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let positions = PositionIndex::build(&document.blocks, &classifier, &captions);
    let locator = TableLocator::new(&positions, &options.rules, &options.labels);
    let built = OutlineBuilder::new(&classifier, &captions, locator).build(&document.blocks);

    let mut chunks = built.chunks;
    let mut arena = built.arena;
    let mut stats = built.stats;

    ImageBinder::new(&positions, &options.rules, &options.labels).bind(&mut chunks, &mut images, &mut stats);

    for chunk in &chunks {
        if let Some(node) = chunk.node {
            for image in &chunk.images {
                arena.push_image(node, image);
            }
        }
    }

    let outline = Outline {
        sop_id: identity.id.clone(),
        sop_name: outline_name(document, &identity),
        sections: arena.into_sections(),
    };

    stats.document_count = 1;
    stats.image_count = images.len() as u32;
    stats.caption_count = images.iter().filter(|r| !r.caption.is_empty()).count() as u32;
    stats.chunk_count = chunks.len() as u32;
    stats.table_chunk_count = chunks.iter().filter(|c| c.is_table()).count() as u32;

    log::info!(
        "{}: {} headings, {} chunks ({} tables), {} images",
        stem,
        stats.heading_count,
        stats.chunk_count,
        stats.table_chunk_count,
        stats.image_count
    );

    ChunkSet {
        identity,
        chunks,
        images,
        outline,
        stats,
    }
}

/// Title paragraph, else the package title, else the first unnumbered
/// paragraph, else the name from the file.
fn outline_name(document: &Document, identity: &SopIdentity) -> String {
    document
        .title_paragraph()
        .map(str::to_string)
        .or_else(|| {
            document
                .metadata
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            document
                .paragraphs()
                .map(|p| p.trimmed())
                .find(|t| !t.is_empty() && !t.starts_with(|c: char| c.is_ascii_digit()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| identity.name.clone())
}
