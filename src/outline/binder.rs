//! Image binding and caption de-duplication.
//!
//! Each image is resolved by the strongest rule that finds a chunk, in
//! this order:
//!
//! 1. **Forced** - the section open at the caption's paragraph;
//! 2. **Numeric** - a section number quoted in the caption;
//! 3. **Keyword** - a caption keyword rule from the [`RuleSet`];
//! 4. **Band** - the image's ordinal band, for images with no caption.
//!
//! Within a rule the first matching chunk in document order wins. Images
//! still unplaced go to the section open where they sit, and failing that
//! to the last chunk with a section path, so no image is lost.

use super::tracker::{path_leaf, PositionIndex};
use super::{Chunk, ImageRecord, Labels, RuleSet};
use crate::render::{collapse_blank_lines, ProcessingStats};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

fn dotted_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\d+").unwrap())
}

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)*").unwrap())
}

fn chart_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^图表\s*\d+[\s：:]*").unwrap())
}

fn figure_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(图表|图|Figure|Fig)\s*\d+").unwrap())
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Rule that placed an image in its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindRule {
    /// Section open at the caption position
    Forced,
    /// Section number quoted in the caption
    Numeric,
    /// Caption keyword rule
    Keyword,
    /// Ordinal band
    Band,
    /// Last chunk with a section
    Fallback,
}

impl std::fmt::Display for BindRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BindRule::Forced => "forced",
            BindRule::Numeric => "numeric",
            BindRule::Keyword => "keyword",
            BindRule::Band => "band",
            BindRule::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Caption text as shown in an image block: `图表 N` prefix removed,
/// whitespace collapsed.
pub fn clean_caption(caption: &str) -> String {
    let stripped = chart_prefix().replace(caption.trim(), "");
    whitespace_run()
        .replace_all(stripped.trim(), " ")
        .into_owned()
}

/// Render the block appended to a chunk for one image.
pub fn image_block(labels: &Labels, filename: &str, section: &str, caption: &str) -> String {
    let mut block = format!("{}{}", labels.image_open, filename);
    let caption = clean_caption(caption);
    if !caption.is_empty() {
        block.push('\n');
        block.push_str(&labels.caption_prefix);
        block.push_str(&caption);
    }
    block.push(']');
    format!("{}\n{}{}", block, labels.location_prefix, section)
}

/// Binds image records to chunks.
#[derive(Debug)]
pub struct ImageBinder<'a> {
    positions: &'a PositionIndex,
    rules: &'a RuleSet,
    labels: &'a Labels,
}

impl<'a> ImageBinder<'a> {
    /// Create a binder.
    pub fn new(positions: &'a PositionIndex, rules: &'a RuleSet, labels: &'a Labels) -> Self {
        Self {
            positions,
            rules,
            labels,
        }
    }

    /// Place every record into a chunk and clean duplicated captions.
    ///
    /// When there are images but no chunk at all, an unknown-section chunk
    /// is appended to hold them.
    pub fn bind(&self, chunks: &mut Vec<Chunk>, records: &mut [ImageRecord], stats: &mut ProcessingStats) {
        for record in records.iter_mut().filter(|r| !r.used) {
            if let Some((index, rule)) = self.resolve(chunks, record) {
                self.attach(&mut chunks[index], record, rule);
                stats.record_binding(rule);
            }
        }

        for record in records.iter_mut().filter(|r| !r.used) {
            let anchored = self
                .anchor_section(record)
                .and_then(|section| self.forced_chunk(chunks, section));
            if let Some(index) = anchored {
                self.attach(&mut chunks[index], record, BindRule::Forced);
                stats.record_binding(BindRule::Forced);
                continue;
            }

            let index = match chunks.iter().rposition(|c| !c.section_path.is_empty()) {
                Some(index) => index,
                None => {
                    chunks.push(Chunk::section(
                        String::new(),
                        self.labels.unknown_section.clone(),
                        None,
                    ));
                    chunks.len() - 1
                }
            };
            log::warn!(
                "image {} has no matching section, appended to '{}'",
                record.filename,
                chunks[index].section_path
            );
            self.attach(&mut chunks[index], record, BindRule::Fallback);
            stats.record_binding(BindRule::Fallback);
        }

        let dedup = CaptionDedup::new(self.labels);
        for chunk in chunks.iter_mut() {
            chunk.text = collapse_blank_lines(&dedup.apply(&chunk.text));
        }
    }

    fn resolve(&self, chunks: &[Chunk], record: &ImageRecord) -> Option<(usize, BindRule)> {
        let first = |pred: &dyn Fn(&str) -> bool| {
            chunks
                .iter()
                .position(|c| !c.section_path.is_empty() && pred(&c.section_path))
        };

        let forced = record
            .caption_index
            .and_then(|i| self.positions.section_at(i))
            .and_then(|section| self.forced_chunk(chunks, section));
        if let Some(i) = forced {
            return Some((i, BindRule::Forced));
        }

        let caption = record.caption.trim();
        if !caption.is_empty() {
            if let Some(m) = dotted_number().find(caption) {
                if let Some(i) = first(&|path: &str| path.contains(m.as_str())) {
                    return Some((i, BindRule::Numeric));
                }
            } else if let Some(m) = leading_number().find(caption) {
                if let Some(i) = first(&|path: &str| path.starts_with(m.as_str())) {
                    return Some((i, BindRule::Numeric));
                }
            }

            if let Some(rule) = self.rules.image_rule(caption) {
                if let Some(i) = first(&|path: &str| path.contains(rule.section.as_str())) {
                    return Some((i, BindRule::Keyword));
                }
            }
        } else if let Some(band) = self.rules.band_for(record.ordinal) {
            if let Some(i) = first(&|path: &str| band.accepts(path)) {
                return Some((i, BindRule::Band));
            }
        }

        None
    }

    /// First chunk whose path ends with the section's leaf or contains it.
    fn forced_chunk(&self, chunks: &[Chunk], section: &str) -> Option<usize> {
        let leaf = path_leaf(section);
        chunks.iter().position(|c| {
            let path = c.section_path.as_str();
            !path.is_empty() && ((!leaf.is_empty() && path.ends_with(leaf)) || path.contains(section))
        })
    }

    /// Section open where the image itself sits.
    fn anchor_section(&self, record: &ImageRecord) -> Option<&'a str> {
        let index = if record.in_table {
            record.source_index.checked_sub(1)?
        } else {
            record.source_index
        };
        self.positions.section_at(index)
    }

    fn attach(&self, chunk: &mut Chunk, record: &mut ImageRecord, rule: BindRule) {
        let block = image_block(self.labels, &record.filename, &chunk.section_path, &record.caption);
        if chunk.text.is_empty() {
            chunk.text = block;
        } else {
            chunk.text.push_str("\n\n");
            chunk.text.push_str(&block);
        }
        chunk.images.push(record.filename.clone());

        log::debug!("image {} -> '{}' ({})", record.filename, chunk.section_path, rule);
        record.used = true;
        record.section_path = Some(chunk.section_path.clone());
        record.bound_by = Some(rule);
    }
}

/// Removes caption lines from prose that an image block already shows.
///
/// Only the text before the first image block is touched. Lines that start
/// like a figure caption are dropped, as are lines equal to a caption
/// inside an image block (unless they start with a digit, which would make
/// them section titles). Applying it twice changes nothing.
#[derive(Debug)]
pub struct CaptionDedup {
    marker: String,
    block: Regex,
}

impl CaptionDedup {
    /// Build the block matcher for a label set.
    pub fn new(labels: &Labels) -> Self {
        let marker = labels.image_open.trim_end().to_string();
        let pattern = format!(
            r"(?s){}[^\]]*?(?:\n{}([^\]]+))?\]",
            regex::escape(&labels.image_open),
            regex::escape(&labels.caption_prefix)
        );
        Self {
            marker,
            block: Regex::new(&pattern).unwrap(),
        }
    }

    /// Clean one chunk text.
    pub fn apply(&self, text: &str) -> String {
        let Some(first) = text.find(&self.marker) else {
            return text.to_string();
        };
        let (prose, blocks) = text.split_at(first);

        let shown: HashSet<&str> = self
            .block
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|c| !c.is_empty())
            .collect();

        let kept: Vec<&str> = prose
            .split('\n')
            .filter(|line| {
                let stripped = line.trim();
                if stripped.is_empty() {
                    return true;
                }
                if figure_line().is_match(stripped) {
                    return false;
                }
                let numbered = stripped.starts_with(|c: char| c.is_ascii_digit());
                numbered || !shown.contains(stripped)
            })
            .collect();

        format!("{}{}", kept.join("\n"), blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::ChunkKind;

    fn record(ordinal: usize, caption: &str, caption_index: Option<usize>, source: usize) -> ImageRecord {
        ImageRecord {
            ordinal,
            filename: format!("doc_image_id____image{}.png", ordinal),
            rel_id: format!("rId{}", ordinal),
            caption: caption.to_string(),
            source_index: source,
            caption_index,
            in_table: false,
            section_path: None,
            bound_by: None,
            used: false,
        }
    }

    fn chunk(text: &str, path: &str) -> Chunk {
        Chunk::section(text.to_string(), path.to_string(), None)
    }

    fn bind(
        positions: &PositionIndex,
        rules: &RuleSet,
        chunks: &mut Vec<Chunk>,
        records: &mut [ImageRecord],
    ) -> ProcessingStats {
        let labels = Labels::default();
        let mut stats = ProcessingStats::new();
        ImageBinder::new(positions, rules, &labels).bind(chunks, records, &mut stats);
        stats
    }

    // ==================== Blocks ====================

    #[test]
    fn test_image_block_format() {
        let labels = Labels::default();
        assert_eq!(
            image_block(&labels, "a_image_id____image1.png", "3. 安全", "图表 12：  叉车\n示意"),
            "[图: a_image_id____image1.png\n图片内容：叉车 示意]\n图片所在SOP位置：3. 安全"
        );
        assert_eq!(
            image_block(&labels, "x.png", "1. 目的", ""),
            "[图: x.png]\n图片所在SOP位置：1. 目的"
        );
    }

    #[test]
    fn test_clean_caption_keeps_plain_figure_prefix() {
        assert_eq!(clean_caption("图3 货架"), "图3 货架");
        assert_eq!(clean_caption("图表3:货架"), "货架");
    }

    // ==================== Binding ====================

    #[test]
    fn test_forced_section_from_caption_position() {
        let positions = PositionIndex {
            tables: vec![],
            paragraphs: vec!["1. 目的".into(), "5. 活动 > 5.1 入库".into(), "5. 活动 > 5.1 入库".into()],
        };
        let mut chunks = vec![chunk("1. 目的", "1. 目的"), chunk("5.1 入库\n卸货", "5.1 入库")];
        let mut records = vec![record(1, "卸货照片", Some(2), 1)];

        let stats = bind(&positions, &RuleSet::default(), &mut chunks, &mut records);
        assert_eq!(stats.bound_forced, 1);
        assert!(records[0].used);
        assert_eq!(records[0].section_path.as_deref(), Some("5.1 入库"));
        assert_eq!(chunks[1].images, vec!["doc_image_id____image1.png"]);
        assert!(chunks[1].text.ends_with("图片内容：卸货照片]\n图片所在SOP位置：5.1 入库"));
    }

    #[test]
    fn test_numeric_caption() {
        let positions = PositionIndex::default();
        let mut chunks = vec![chunk("3.1 风险", "3.1 风险"), chunk("3.2 控制", "3.2 控制")];
        let mut records = vec![record(1, "见 3.2 控制点示意", None, 0)];

        let stats = bind(&positions, &RuleSet::default(), &mut chunks, &mut records);
        assert_eq!(stats.bound_numeric, 1);
        assert_eq!(chunks[1].images.len(), 1);
        assert!(chunks[0].images.is_empty());
    }

    #[test]
    fn test_keyword_rule() {
        let positions = PositionIndex::default();
        let mut chunks = vec![chunk("8. 其他", "8. 其他"), chunk("9.配送模式", "9.配送模式")];
        let mut records = vec![record(1, "配送模式流程", None, 0)];

        let stats = bind(&positions, &RuleSet::default(), &mut chunks, &mut records);
        assert_eq!(stats.bound_keyword, 1);
        assert_eq!(records[0].bound_by, Some(BindRule::Keyword));
        assert_eq!(chunks[1].images.len(), 1);
    }

    #[test]
    fn test_band_for_uncaptioned() {
        let positions = PositionIndex::default();
        let mut chunks = vec![chunk("1. 目的", "1. 目的"), chunk("3. 安全", "3. 安全")];
        let mut records = vec![record(1, "", None, 0), record(4, "", None, 0)];

        let stats = bind(&positions, &RuleSet::default(), &mut chunks, &mut records);
        assert_eq!(stats.bound_band, 2);
        assert_eq!(records[0].section_path.as_deref(), Some("1. 目的"));
        assert_eq!(records[1].section_path.as_deref(), Some("3. 安全"));
    }

    #[test]
    fn test_leftover_uses_image_position() {
        let positions = PositionIndex {
            tables: vec![],
            paragraphs: vec!["7. 附录".into(), "8. 记录".into()],
        };
        let mut chunks = vec![chunk("7. 附录", "7. 附录"), chunk("8. 记录", "8. 记录")];
        let mut records = vec![record(9, "", None, 0)];

        let stats = bind(&positions, &RuleSet::empty(), &mut chunks, &mut records);
        assert_eq!(stats.bound_forced, 1);
        assert_eq!(chunks[0].images.len(), 1);
    }

    #[test]
    fn test_leftovers_go_to_last_chunk() {
        let positions = PositionIndex::default();
        let mut chunks = vec![chunk("7. 附录", "7. 附录"), chunk("8. 记录", "8. 记录")];
        let mut records = vec![record(2, "无关的说明", None, 0)];

        let stats = bind(&positions, &RuleSet::empty(), &mut chunks, &mut records);
        assert_eq!(stats.bound_fallback, 1);
        assert_eq!(chunks[1].images.len(), 1);
        assert!(records.iter().all(|r| r.used));
    }

    #[test]
    fn test_removed_caption_leaves_single_blank_line() {
        let positions = PositionIndex::default();
        let mut chunks = vec![chunk("8. 记录\n\n图2 叉车", "8. 记录")];
        let mut records = vec![record(2, "无关的说明", None, 0)];

        bind(&positions, &RuleSet::empty(), &mut chunks, &mut records);
        assert_eq!(
            chunks[0].text,
            "8. 记录\n\n[图: doc_image_id____image2.png\n图片内容：无关的说明]\n图片所在SOP位置：8. 记录"
        );
    }

    #[test]
    fn test_no_chunks_creates_unknown_section() {
        let positions = PositionIndex::default();
        let mut chunks = Vec::new();
        let mut records = vec![record(1, "", None, 0)];

        bind(&positions, &RuleSet::default(), &mut chunks, &mut records);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section_path, "未知章节");
        assert_eq!(chunks[0].kind, ChunkKind::Section);
        assert!(chunks[0].text.starts_with("[图: "));
        assert!(records[0].used);
    }

    // ==================== Dedup ====================

    #[test]
    fn test_dedup_removes_caption_lines() {
        let dedup = CaptionDedup::new(&Labels::default());
        let text = "5.1 入库\n图表 3：卸货\n卸货照片\n叉车卸货\n\n[图: a.png\n图片内容：卸货照片]\n图片所在SOP位置：5.1 入库";
        let cleaned = dedup.apply(text);
        assert_eq!(
            cleaned,
            "5.1 入库\n叉车卸货\n\n[图: a.png\n图片内容：卸货照片]\n图片所在SOP位置：5.1 入库"
        );
        assert_eq!(dedup.apply(&cleaned), cleaned);
    }

    #[test]
    fn test_dedup_keeps_numbered_lines() {
        let dedup = CaptionDedup::new(&Labels::default());
        let text = "3.1 风险\n\n[图: a.png\n图片内容：3.1 风险]\n图片所在SOP位置：3.1 风险";
        assert_eq!(dedup.apply(text), text);
        assert_eq!(dedup.apply("no images here"), "no images here");
    }
}
