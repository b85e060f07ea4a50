//! Single-pass outline builder.
//!
//! Walks the block stream once. Each heading flushes the pending text as a
//! chunk and opens a new node; body paragraphs accumulate under the open
//! heading; tables are located and queued so they follow the text chunk of
//! the section they sit in.

use super::tables::TableLocator;
use super::tracker::HeadingTracker;
use super::tree::OutlineArena;
use super::{Chunk, HeadingClassifier};
use crate::model::{Block, Paragraph, Table};
use crate::render::{normalize_list_markers, ProcessingStats};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn numbered_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)*(?:\.)?\s*.+").unwrap())
}

/// What the builder produced.
#[derive(Debug)]
pub(crate) struct BuiltOutline {
    pub chunks: Vec<Chunk>,
    pub arena: OutlineArena,
    pub stats: ProcessingStats,
}

/// Outline state threaded through one pass over a document.
pub(crate) struct OutlineBuilder<'a> {
    classifier: &'a HeadingClassifier<'a>,
    captions: &'a HashSet<String>,
    locator: TableLocator<'a>,
    tracker: HeadingTracker,
    arena: OutlineArena,
    node_stack: Vec<usize>,
    buffer: Vec<String>,
    pending_tables: Vec<Chunk>,
    chunks: Vec<Chunk>,
    table_ordinal: usize,
    stats: ProcessingStats,
}

impl<'a> OutlineBuilder<'a> {
    pub(crate) fn new(
        classifier: &'a HeadingClassifier<'a>,
        captions: &'a HashSet<String>,
        locator: TableLocator<'a>,
    ) -> Self {
        Self {
            classifier,
            captions,
            locator,
            tracker: HeadingTracker::new(),
            arena: OutlineArena::new(),
            node_stack: Vec::new(),
            buffer: Vec::new(),
            pending_tables: Vec::new(),
            chunks: Vec::new(),
            table_ordinal: 0,
            stats: ProcessingStats::new(),
        }
    }

    /// Consume the whole block stream.
    pub(crate) fn build(mut self, blocks: &[Block]) -> BuiltOutline {
        for block in blocks {
            match block {
                Block::Paragraph(p) => self.paragraph(p),
                Block::Table(t) => self.table(t),
            }
        }
        self.flush();

        BuiltOutline {
            chunks: self.chunks,
            arena: self.arena,
            stats: self.stats,
        }
    }

    fn paragraph(&mut self, paragraph: &Paragraph) {
        self.stats.add_paragraph();
        if paragraph.is_empty() {
            return;
        }
        let text = paragraph.trimmed();

        if let Some(level) = self.classifier.classify(paragraph, self.captions) {
            self.open_heading(text, level);
            return;
        }

        // A caption that reads like a heading neither splits nor feeds the section.
        if self.captions.contains(text) && self.classifier.signal_level(paragraph).is_some() {
            log::debug!("caption '{}' not treated as heading", text);
            return;
        }

        self.buffer.push(text.to_string());
        if let Some(&node) = self.node_stack.last() {
            self.arena.push_content(node, text);
        }
    }

    fn open_heading(&mut self, text: &str, level: u8) {
        self.flush();

        let heading = self.tracker.push(text, level);
        self.stats.add_heading();
        log::debug!("heading L{} '{}' -> '{}'", level, heading.title, self.tracker.path());

        self.node_stack
            .truncate(self.tracker.stack().len().saturating_sub(1));
        let parent = self.node_stack.last().copied();
        let node = self.arena.add(parent, &heading.title, level);
        self.arena.push_content(node, &heading.title);
        self.node_stack.push(node);

        self.buffer.push(heading.title);
    }

    fn table(&mut self, table: &Table) {
        self.stats.add_table();
        let ordinal = self.table_ordinal;
        self.table_ordinal += 1;

        let Some(located) = self.locator.locate(ordinal, table) else {
            return;
        };
        log::debug!("table {} -> '{}'", ordinal, located.section_path);

        let node = self.node_stack.last().copied();
        if let Some(node) = node {
            self.arena.push_content(node, &located.markdown);
        }
        self.pending_tables
            .push(Chunk::table(located.text, located.section_path, node));
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let text = normalize_list_markers(&self.buffer.join("\n"));
            let path = self.section_path(&text);
            self.buffer.clear();

            if path.is_empty() {
                log::debug!("dropping text before the first heading");
                self.stats.dropped_preamble += 1;
            } else {
                let node = self.node_stack.last().copied();
                self.chunks.push(Chunk::section(text, path, node));
            }
        }
        self.chunks.append(&mut self.pending_tables);
    }

    /// Open path, unless the text starts with a numbered line, which then
    /// names the section.
    fn section_path(&self, text: &str) -> String {
        let first_line = text.split('\n').next().unwrap_or_default().trim();
        if numbered_line().is_match(first_line) {
            return first_line.to_string();
        }
        self.tracker.path()
    }
}
