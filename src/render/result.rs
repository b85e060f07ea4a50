//! Processing report with output paths and statistics.

use crate::model::SopIdentity;
use crate::outline::BindRule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Files written for one document, plus what the pipeline saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Source document
    pub source: PathBuf,

    /// SOP identity derived from the file name
    pub identity: SopIdentity,

    /// Chunk CSV, when written
    pub csv_path: Option<PathBuf>,

    /// JSON outline, when written
    pub json_path: Option<PathBuf>,

    /// Directory holding the extracted images
    pub image_dir: Option<PathBuf>,

    /// Image files actually written
    pub images_written: usize,

    /// Pipeline statistics
    pub stats: ProcessingStats,
}

impl ProcessReport {
    /// Create a report with no outputs recorded yet.
    pub fn new(source: impl Into<PathBuf>, identity: SopIdentity, stats: ProcessingStats) -> Self {
        Self {
            source: source.into(),
            identity,
            csv_path: None,
            json_path: None,
            image_dir: None,
            images_written: 0,
            stats,
        }
    }

    /// Every output file recorded in the report.
    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.csv_path.iter().chain(self.json_path.iter()).collect()
    }
}

/// Statistics collected while chunking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Documents processed (1 for a single run)
    pub document_count: u32,

    /// Body paragraphs seen
    pub paragraph_count: u32,

    /// Headings opened
    pub heading_count: u32,

    /// Tables seen, including blank ones
    pub table_count: u32,

    /// Images extracted
    pub image_count: u32,

    /// Images that found a caption
    pub caption_count: u32,

    /// Images bound by their caption position
    pub bound_forced: u32,

    /// Images bound by a section number in the caption
    pub bound_numeric: u32,

    /// Images bound by a caption keyword rule
    pub bound_keyword: u32,

    /// Images bound by ordinal band
    pub bound_band: u32,

    /// Images placed by the last-chunk fallback
    pub bound_fallback: u32,

    /// Chunks emitted, tables included
    pub chunk_count: u32,

    /// Table chunks emitted
    pub table_chunk_count: u32,

    /// Text runs dropped for lack of a section
    pub dropped_preamble: u32,
}

impl ProcessingStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment paragraph count.
    pub fn add_paragraph(&mut self) {
        self.paragraph_count += 1;
    }

    /// Increment heading count.
    pub fn add_heading(&mut self) {
        self.heading_count += 1;
    }

    /// Increment table count.
    pub fn add_table(&mut self) {
        self.table_count += 1;
    }

    /// Count one image bound by `rule`.
    pub fn record_binding(&mut self, rule: BindRule) {
        match rule {
            BindRule::Forced => self.bound_forced += 1,
            BindRule::Numeric => self.bound_numeric += 1,
            BindRule::Keyword => self.bound_keyword += 1,
            BindRule::Band => self.bound_band += 1,
            BindRule::Fallback => self.bound_fallback += 1,
        }
    }

    /// Images bound by any rule.
    pub fn bound_total(&self) -> u32 {
        self.bound_forced + self.bound_numeric + self.bound_keyword + self.bound_band + self.bound_fallback
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.document_count += other.document_count;
        self.paragraph_count += other.paragraph_count;
        self.heading_count += other.heading_count;
        self.table_count += other.table_count;
        self.image_count += other.image_count;
        self.caption_count += other.caption_count;
        self.bound_forced += other.bound_forced;
        self.bound_numeric += other.bound_numeric;
        self.bound_keyword += other.bound_keyword;
        self.bound_band += other.bound_band;
        self.bound_fallback += other.bound_fallback;
        self.chunk_count += other.chunk_count;
        self.table_chunk_count += other.table_chunk_count;
        self.dropped_preamble += other.dropped_preamble;
    }
}
