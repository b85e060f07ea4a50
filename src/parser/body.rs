//! Streaming walk over `word/document.xml` producing the block stream.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::xml::{get_attr, Relationship};
use crate::error::{Error, Result};
use crate::model::{Block, ImageRef, Paragraph, Table, TableCell, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum VMerge {
    #[default]
    None,
    Restart,
    Continue,
}

#[derive(Debug, Default)]
struct ParagraphBuilder {
    text: String,
    style_id: Option<String>,
    images: Vec<ImageRef>,
}

#[derive(Debug)]
struct CellBuilder {
    paragraphs: Vec<String>,
    grid_span: usize,
    v_merge: VMerge,
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            grid_span: 1,
            v_merge: VMerge::None,
        }
    }
}

#[derive(Debug, Clone)]
struct CellSlot {
    text: String,
    v_merge: VMerge,
}

#[derive(Debug, Default)]
struct TableBuilder {
    rows: Vec<Vec<CellSlot>>,
    row: Option<Vec<CellSlot>>,
    cell: Option<CellBuilder>,
    images: Vec<ImageRef>,
}

impl TableBuilder {
    fn push_cell_paragraph(&mut self, text: String) {
        if let Some(cell) = self.cell.as_mut() {
            cell.paragraphs.push(text);
        }
    }

    fn end_cell(&mut self) {
        let Some(cell) = self.cell.take() else {
            return;
        };
        let text = cell.paragraphs.join("\n");
        let row = self.row.get_or_insert_with(Vec::new);
        for _ in 0..cell.grid_span.max(1) {
            row.push(CellSlot {
                text: text.clone(),
                v_merge: cell.v_merge,
            });
        }
    }

    fn end_row(&mut self) {
        self.end_cell();
        if let Some(row) = self.row.take() {
            self.rows.push(row);
        }
    }

    /// Resolve vertical merges and produce the final table.
    fn finish(mut self) -> Table {
        self.end_row();
        let mut rows: Vec<TableRow> = Vec::with_capacity(self.rows.len());
        for slots in self.rows {
            let cells = slots
                .into_iter()
                .enumerate()
                .map(|(col, slot)| {
                    if slot.v_merge == VMerge::Continue {
                        let above = rows
                            .last()
                            .and_then(|r: &TableRow| r.cells.get(col))
                            .map(|c| c.text.clone())
                            .unwrap_or_default();
                        TableCell::text(above)
                    } else {
                        TableCell::text(slot.text)
                    }
                })
                .collect();
            rows.push(TableRow::new(cells));
        }
        Table {
            rows,
            images: self.images,
        }
    }
}

/// State machine over body XML events.
pub(crate) struct BodyWalker<'a> {
    styles: &'a HashMap<String, String>,
    rels: &'a HashMap<String, Relationship>,
    blocks: Vec<Block>,
    paragraphs: Vec<ParagraphBuilder>,
    tables: Vec<TableBuilder>,
    run_depth: usize,
    in_text: bool,
    in_body: bool,
    fallback_depth: usize,
    alt_text: (Option<String>, Option<String>),
}

impl<'a> BodyWalker<'a> {
    pub(crate) fn new(
        styles: &'a HashMap<String, String>,
        rels: &'a HashMap<String, Relationship>,
    ) -> Self {
        Self {
            styles,
            rels,
            blocks: Vec::new(),
            paragraphs: Vec::new(),
            tables: Vec::new(),
            run_depth: 0,
            in_text: false,
            in_body: false,
            fallback_depth: 0,
            alt_text: (None, None),
        }
    }

    /// Walk the whole document part and return its blocks.
    pub(crate) fn walk(mut self, xml: &str) -> Result<Vec<Block>> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => self.start_element(&e, false),
                Ok(Event::Empty(e)) => {
                    self.start_element(&e, true);
                    self.end_element(e.name().as_ref());
                }
                Ok(Event::End(e)) => self.end_element(e.name().as_ref()),
                Ok(Event::Text(t)) if self.in_text && self.fallback_depth == 0 => {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Xml(format!("document body: {}", e)))?;
                    self.push_text(&text);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(format!("document body: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        Ok(self.blocks)
    }

    fn start_element(&mut self, e: &BytesStart, is_empty: bool) {
        let name = e.name();
        let name = name.as_ref();
        if name == b"w:body" {
            self.in_body = true;
            return;
        }
        if !self.in_body {
            return;
        }
        // Only the `mc:Choice` branch of alternate content is read.
        if name == b"mc:Fallback" {
            self.fallback_depth += 1;
            return;
        }
        if self.fallback_depth > 0 {
            return;
        }

        match name {
            b"w:p" => self.paragraphs.push(ParagraphBuilder::default()),
            b"w:pStyle" => {
                if let (Some(p), Some(id)) = (self.paragraphs.last_mut(), get_attr(e, b"w:val")) {
                    p.style_id.get_or_insert(id);
                }
            }
            b"w:r" => self.run_depth += 1,
            b"w:t" if !is_empty => self.in_text = true,
            b"w:tab" if self.run_depth > 0 => self.push_text("\t"),
            b"w:br" if self.run_depth > 0 => {
                if get_attr(e, b"w:type").as_deref() != Some("page") {
                    self.push_text("\n");
                }
            }
            b"w:cr" if self.run_depth > 0 => self.push_text("\n"),
            b"w:noBreakHyphen" if self.run_depth > 0 => self.push_text("-"),
            b"wp:docPr" => {
                self.alt_text = (get_attr(e, b"title"), get_attr(e, b"descr"));
            }
            b"a:blip" => {
                if let Some(rel_id) = get_attr(e, b"r:embed") {
                    self.push_image(rel_id, None);
                }
            }
            b"v:imagedata" => {
                if let Some(rel_id) = get_attr(e, b"r:id") {
                    let title = get_attr(e, b"o:title");
                    self.push_image(rel_id, title);
                }
            }
            b"w:tbl" => self.tables.push(TableBuilder::default()),
            b"w:tr" => {
                if let Some(t) = self.tables.last_mut() {
                    t.end_row();
                    t.row = Some(Vec::new());
                }
            }
            b"w:tc" => {
                if let Some(t) = self.tables.last_mut() {
                    t.end_cell();
                    t.cell = Some(CellBuilder::default());
                }
            }
            b"w:gridSpan" => {
                let span = get_attr(e, b"w:val").and_then(|v| v.parse::<usize>().ok());
                if let (Some(cell), Some(span)) = (self.current_cell(), span) {
                    cell.grid_span = span.clamp(1, 64);
                }
            }
            b"w:vMerge" => {
                let merge = match get_attr(e, b"w:val").as_deref() {
                    Some("restart") => VMerge::Restart,
                    _ => VMerge::Continue,
                };
                if let Some(cell) = self.current_cell() {
                    cell.v_merge = merge;
                }
            }
            _ => {}
        }
    }

    fn end_element(&mut self, name: &[u8]) {
        if name == b"w:body" {
            self.in_body = false;
            return;
        }
        if !self.in_body {
            return;
        }
        if name == b"mc:Fallback" {
            self.fallback_depth = self.fallback_depth.saturating_sub(1);
            return;
        }
        if self.fallback_depth > 0 {
            return;
        }

        match name {
            b"w:t" => self.in_text = false,
            b"w:r" => self.run_depth = self.run_depth.saturating_sub(1),
            b"w:p" => self.end_paragraph(),
            b"w:tc" => {
                if let Some(t) = self.tables.last_mut() {
                    t.end_cell();
                }
            }
            b"w:tr" => {
                if let Some(t) = self.tables.last_mut() {
                    t.end_row();
                }
            }
            b"w:tbl" => self.end_table(),
            _ => {}
        }
    }

    fn current_cell(&mut self) -> Option<&mut CellBuilder> {
        self.tables.last_mut().and_then(|t| t.cell.as_mut())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(p) = self.paragraphs.last_mut() {
            p.text.push_str(text);
        }
    }

    fn push_image(&mut self, rel_id: String, fallback_title: Option<String>) {
        let target = self.rels.get(&rel_id).map(|r| r.target.clone());
        let (title, descr) = self.alt_text.clone();
        let mut image = ImageRef::new(rel_id).with_alt_text(title.or(fallback_title), descr);
        image.target = target;

        if let Some(p) = self.paragraphs.last_mut() {
            p.images.push(image);
        } else if let Some(t) = self.tables.last_mut() {
            t.images.push(image);
        } else {
            log::debug!("image {} outside any paragraph ignored", image.rel_id);
        }
    }

    fn end_paragraph(&mut self) {
        let Some(para) = self.paragraphs.pop() else {
            return;
        };
        self.alt_text = (None, None);

        // Text boxes nest paragraphs; fold them into the host paragraph.
        if let Some(parent) = self.paragraphs.last_mut() {
            if !para.text.trim().is_empty() {
                if !parent.text.is_empty() {
                    parent.text.push('\n');
                }
                parent.text.push_str(&para.text);
            }
            parent.images.extend(para.images);
            return;
        }

        if let Some(table) = self.tables.last_mut() {
            table.push_cell_paragraph(para.text);
            table.images.extend(para.images);
            return;
        }

        let style = para
            .style_id
            .map(|id| self.styles.get(&id).cloned().unwrap_or(id));
        self.blocks.push(Block::Paragraph(Paragraph {
            text: para.text,
            style,
            images: para.images,
        }));
    }

    fn end_table(&mut self) {
        let Some(builder) = self.tables.pop() else {
            return;
        };
        let table = builder.finish();

        if let Some(outer) = self.tables.last_mut() {
            outer.push_cell_paragraph(table.plain_text());
            outer.images.extend(table.images);
            return;
        }

        self.blocks.push(Block::Table(table));
    }
}
