//! Image extraction and caption search.

use super::binder::BindRule;
use super::HeadingClassifier;
use crate::model::{Block, Document, ImageRef, Paragraph, Resource};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub(crate) fn figure_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(图表|图|Figure|Fig)[\s：:]*\d+").unwrap())
}

/// An extracted image and what is known about where it belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 1-based position among the document's images
    pub ordinal: usize,

    /// Output file name, `{stem}_image_id____image{N}.{ext}`
    pub filename: String,

    /// Relationship id of the picture part
    pub rel_id: String,

    /// Best caption found, empty when none
    pub caption: String,

    /// Paragraph ordinal the image is anchored at
    pub source_index: usize,

    /// Paragraph ordinal the caption came from
    pub caption_index: Option<usize>,

    /// Whether the image sits inside a table cell
    pub in_table: bool,

    /// Section path the image was bound to
    pub section_path: Option<String>,

    /// Rule that bound the image
    pub bound_by: Option<BindRule>,

    /// Set once the image is placed in a chunk
    pub used: bool,
}

#[derive(Debug, Clone)]
struct Candidate {
    text: String,
    index: usize,
    score: u8,
}

/// Finds images and their captions in a document.
#[derive(Debug, Clone)]
pub struct ImageExtractor<'a> {
    classifier: &'a HeadingClassifier<'a>,
    window: usize,
    max_caption_len: usize,
}

impl<'a> ImageExtractor<'a> {
    /// Create an extractor.
    pub fn new(classifier: &'a HeadingClassifier<'a>, window: usize, max_caption_len: usize) -> Self {
        Self {
            classifier,
            window,
            max_caption_len,
        }
    }

    /// Extract every image in document order, named after `stem`.
    pub fn extract(&self, document: &Document, stem: &str) -> Vec<ImageRecord> {
        let paragraphs: Vec<&Paragraph> = document.paragraphs().collect();

        let mut anchors: Vec<(&ImageRef, usize, bool)> = Vec::new();
        let mut next_paragraph = 0;
        for block in &document.blocks {
            match block {
                Block::Paragraph(p) => {
                    anchors.extend(p.images.iter().map(|img| (img, next_paragraph, false)));
                    next_paragraph += 1;
                }
                // Cell images sit between the neighbouring body paragraphs.
                Block::Table(t) => {
                    anchors.extend(t.images.iter().map(|img| (img, next_paragraph, true)));
                }
            }
        }

        let mut records: Vec<ImageRecord> = anchors
            .into_iter()
            .enumerate()
            .map(|(i, (image, anchor, in_table))| {
                let ordinal = i + 1;
                let (caption, caption_index) = self
                    .best_caption(&paragraphs, image, anchor, in_table)
                    .map(|c| (c.text, Some(c.index)))
                    .unwrap_or_default();
                ImageRecord {
                    ordinal,
                    filename: format!(
                        "{}_image_id____image{}.{}",
                        stem,
                        ordinal,
                        image_extension(document, image)
                    ),
                    rel_id: image.rel_id.clone(),
                    caption,
                    source_index: anchor,
                    caption_index,
                    in_table,
                    section_path: None,
                    bound_by: None,
                    used: false,
                }
            })
            .collect();

        self.fill_missing_captions(&paragraphs, &mut records);

        for record in &records {
            if record.caption.is_empty() {
                log::debug!("image {} has no caption", record.filename);
            } else {
                log::debug!("image {} caption '{}'", record.filename, record.caption);
            }
        }

        records
    }

    /// Check if a paragraph text could serve as a caption.
    pub fn is_caption_shaped(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty()
            && (figure_prefix().is_match(text) || text.chars().count() <= self.max_caption_len)
    }

    fn best_caption(
        &self,
        paragraphs: &[&Paragraph],
        image: &ImageRef,
        anchor: usize,
        in_table: bool,
    ) -> Option<Candidate> {
        let mut candidates = Vec::new();

        if !in_table {
            if let Some(own) = paragraphs.get(anchor).map(|p| p.trimmed()) {
                if !own.is_empty() {
                    let score = if figure_prefix().is_match(own) { 2 } else { 1 };
                    candidates.push(Candidate {
                        text: own.to_string(),
                        index: anchor,
                        score,
                    });
                }
            }
        }

        // Preceding paragraphs, nearest first.
        for j in (anchor.saturating_sub(self.window)..anchor).rev() {
            match self.neighbour(paragraphs[j]) {
                Neighbour::Stop => break,
                Neighbour::Skip => continue,
                Neighbour::Caption(text) => {
                    let score = if figure_prefix().is_match(text) { 3 } else { 1 };
                    candidates.push(Candidate {
                        text: text.to_string(),
                        index: j,
                        score,
                    });
                }
            }
        }

        let first_following = if in_table { anchor } else { anchor + 1 };
        let last_following = (first_following + self.window).min(paragraphs.len());
        for j in first_following..last_following {
            match self.neighbour(paragraphs[j]) {
                Neighbour::Stop => break,
                Neighbour::Skip => continue,
                Neighbour::Caption(text) => {
                    let score = if figure_prefix().is_match(text) { 2 } else { 1 };
                    candidates.push(Candidate {
                        text: text.to_string(),
                        index: j,
                        score,
                    });
                }
            }
        }

        for alt in image.alt_texts() {
            candidates.push(Candidate {
                text: alt.to_string(),
                index: anchor,
                score: 4,
            });
        }

        candidates.sort_by_key(|c| (std::cmp::Reverse(c.score), c.index.abs_diff(anchor)));
        candidates.into_iter().next()
    }

    fn neighbour<'p>(&self, paragraph: &'p Paragraph) -> Neighbour<'p> {
        let text = paragraph.trimmed();
        if text.is_empty() {
            return Neighbour::Skip;
        }
        if self.classifier.signal_level(paragraph).is_some() {
            return Neighbour::Stop;
        }
        if self.is_caption_shaped(text) {
            Neighbour::Caption(text)
        } else {
            Neighbour::Skip
        }
    }

    /// Give uncaptioned images the nearest caption-shaped paragraph,
    /// preferring one at or before the image.
    fn fill_missing_captions(&self, paragraphs: &[&Paragraph], records: &mut [ImageRecord]) {
        if records.iter().all(|r| !r.caption.is_empty()) {
            return;
        }

        let pool: Vec<(usize, &str)> = paragraphs
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.trimmed()))
            .filter(|(i, t)| {
                self.is_caption_shaped(t) && self.classifier.signal_level(paragraphs[*i]).is_none()
            })
            .collect();

        for record in records.iter_mut().filter(|r| r.caption.is_empty()) {
            let anchor = record.source_index;
            // Distance in tenths; earlier paragraphs win by a tenth.
            let nearest = pool.iter().min_by_key(|(i, _)| {
                let dist = i.abs_diff(anchor) * 10;
                if *i <= anchor {
                    dist.saturating_sub(1)
                } else {
                    dist
                }
            });
            if let Some((i, text)) = nearest {
                log::debug!("image {} falls back to nearby caption '{}'", record.filename, text);
                record.caption = text.to_string();
                record.caption_index = Some(*i);
            }
        }
    }
}

enum Neighbour<'p> {
    Stop,
    Skip,
    Caption(&'p str),
}

/// File extension for an image: from the loaded part, else its target name.
fn image_extension(document: &Document, image: &ImageRef) -> String {
    if let Some(resource) = document.get_resource(&image.rel_id) {
        return resource.extension().to_string();
    }
    image
        .target
        .as_deref()
        .and_then(Resource::mime_from_name)
        .map(|mime| Resource::image(Vec::new(), mime).extension().to_string())
        .unwrap_or_else(|| "png".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;
    use crate::outline::RuleSet;

    fn extract(doc: &Document) -> Vec<ImageRecord> {
        let rules = RuleSet::default();
        let classifier = HeadingClassifier::new(&rules, 10);
        ImageExtractor::new(&classifier, 8, 120).extract(doc, "SOP-1仓库")
    }

    fn image(rel: &str) -> ImageRef {
        ImageRef::new(rel).with_target(format!("media/{}.jpeg", rel))
    }

    #[test]
    fn test_filenames_are_contiguous() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::new().with_image(image("rId1")).with_image(image("rId2")));
        doc.add_paragraph(Paragraph::with_text("正文"));
        doc.add_paragraph(Paragraph::new().with_image(ImageRef::new("rId3")));

        let records = extract(&doc);
        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "SOP-1仓库_image_id____image1.jpg",
                "SOP-1仓库_image_id____image2.jpg",
                "SOP-1仓库_image_id____image3.png",
            ]
        );
        assert_eq!(records[2].ordinal, 3);
    }

    #[test]
    fn test_preceding_figure_caption_wins() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("3. 安全要求"));
        doc.add_paragraph(Paragraph::with_text("图表 1：叉车示意"));
        doc.add_paragraph(Paragraph::new().with_image(image("rId1")));
        doc.add_paragraph(Paragraph::with_text("图2 后置"));

        let records = extract(&doc);
        assert_eq!(records[0].caption, "图表 1：叉车示意");
        assert_eq!(records[0].caption_index, Some(1));
        assert_eq!(records[0].source_index, 2);
    }

    #[test]
    fn test_alt_text_outranks_neighbours() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("图表 1：叉车示意"));
        doc.add_paragraph(
            Paragraph::new().with_image(image("rId1").with_alt_text(None, Some("托盘堆放".into()))),
        );
        let records = extract(&doc);
        assert_eq!(records[0].caption, "托盘堆放");
        assert_eq!(records[0].caption_index, Some(1));
    }

    #[test]
    fn test_search_stops_at_heading() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("图1 上一节的图"));
        doc.add_paragraph(Paragraph::with_text("5.1 入库"));
        doc.add_paragraph(Paragraph::new().with_image(image("rId1")));
        doc.add_paragraph(Paragraph::with_text("卸货完成后拍照"));

        let records = extract(&doc);
        assert_eq!(records[0].caption, "卸货完成后拍照");
        assert_eq!(records[0].caption_index, Some(3));
    }

    #[test]
    fn test_long_paragraphs_are_not_captions() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("长".repeat(200)));
        doc.add_paragraph(Paragraph::new().with_image(image("rId1")));

        let records = extract(&doc);
        assert!(records[0].caption.is_empty());
        assert_eq!(records[0].caption_index, None);
    }

    #[test]
    fn test_fallback_prefers_preceding() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("前面的说明"));
        doc.add_paragraph(Paragraph::with_text("2. 适用范围"));
        doc.add_paragraph(Paragraph::new().with_image(image("rId1")));
        doc.add_paragraph(Paragraph::with_text("3. 安全要求"));
        doc.add_paragraph(Paragraph::with_text("后面的说明"));

        let records = extract(&doc);
        // Both are two steps away; the earlier one wins.
        assert_eq!(records[0].caption, "前面的说明");
        assert_eq!(records[0].caption_index, Some(0));
    }

    #[test]
    fn test_fallback_skips_headings() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("前面的说明"));
        doc.add_paragraph(Paragraph::with_text("2. 适用范围"));
        doc.add_paragraph(Paragraph::new().with_image(image("rId1")));
        doc.add_paragraph(Paragraph::with_text("3. 安全要求"));

        let records = extract(&doc);
        assert_eq!(records[0].caption, "前面的说明");
        assert_eq!(records[0].caption_index, Some(0));
    }

    #[test]
    fn test_table_images_anchor_between_paragraphs() {
        let mut table = Table::from_grid([vec!["示意"]]);
        table.images.push(image("rId9"));

        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::with_text("图3 货架"));
        doc.add_table(table);
        doc.add_paragraph(Paragraph::with_text("后文"));

        let records = extract(&doc);
        assert_eq!(records.len(), 1);
        assert!(records[0].in_table);
        assert_eq!(records[0].source_index, 1);
        assert_eq!(records[0].caption, "图3 货架");
    }
}
