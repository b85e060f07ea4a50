//! The open-heading stack and the positional pre-pass built on it.

use super::numbering::{NumberedHeading, SectionNumbering};
use super::HeadingClassifier;
use crate::model::Block;
use std::collections::HashSet;

/// Separator between titles in a section path.
pub const PATH_SEPARATOR: &str = " > ";

/// A heading that is currently open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenHeading {
    /// Heading level
    pub level: u8,
    /// Section number components
    pub numbers: Vec<u32>,
    /// Numbered display title
    pub title: String,
}

/// Numbering plus the stack of open headings, root first.
///
/// Levels strictly increase from root to leaf. A new heading of level L
/// closes every open heading of level ≥ L. When the new heading carries a
/// full section number (one component per level), ancestors whose number is
/// not a prefix of it are closed too.
#[derive(Debug, Clone, Default)]
pub struct HeadingTracker {
    numbering: SectionNumbering,
    stack: Vec<OpenHeading>,
}

impl HeadingTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a heading; returns its numbered form.
    pub fn push(&mut self, raw: &str, level: u8) -> NumberedHeading {
        let heading = self.numbering.assign(raw, level);

        self.stack.retain(|open| open.level < level);
        let fully_numbered = heading.numbers.len() == level as usize;
        while let Some(top) = self.stack.last() {
            if !fully_numbered || heading.numbers.starts_with(&top.numbers) {
                break;
            }
            log::debug!("closing stale heading '{}' under '{}'", top.title, heading.title);
            self.stack.pop();
        }

        self.stack.push(OpenHeading {
            level,
            numbers: heading.numbers.clone(),
            title: heading.title.clone(),
        });
        heading
    }

    /// Open headings, root first.
    pub fn stack(&self) -> &[OpenHeading] {
        &self.stack
    }

    /// Innermost open heading.
    pub fn leaf(&self) -> Option<&OpenHeading> {
        self.stack.last()
    }

    /// Section path of the open headings.
    pub fn path(&self) -> String {
        self.stack
            .iter()
            .map(|h| h.title.as_str())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    /// Check if any heading is open.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Last segment of a section path.
pub fn path_leaf(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path).trim()
}

/// Section paths recorded by replaying the block stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    /// Path open at each table, by table ordinal
    pub tables: Vec<String>,
    /// Path open after each body paragraph, by paragraph ordinal
    pub paragraphs: Vec<String>,
}

impl PositionIndex {
    /// Replay the blocks with the same classifier and numbering as the
    /// main pass.
    pub fn build(
        blocks: &[Block],
        classifier: &HeadingClassifier<'_>,
        captions: &HashSet<String>,
    ) -> Self {
        let mut tracker = HeadingTracker::new();
        let mut index = Self::default();

        for block in blocks {
            match block {
                Block::Paragraph(p) => {
                    if let Some(level) = classifier.classify(p, captions) {
                        tracker.push(p.trimmed(), level);
                    }
                    index.paragraphs.push(tracker.path());
                }
                Block::Table(_) => index.tables.push(tracker.path()),
            }
        }

        index
    }

    /// Recorded path of a table, if a heading was open.
    pub fn table_path(&self, ordinal: usize) -> Option<&str> {
        self.tables
            .get(ordinal)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Nearest non-empty path at or before a paragraph.
    pub fn section_at(&self, paragraph: usize) -> Option<&str> {
        let end = paragraph.min(self.paragraphs.len().checked_sub(1)?);
        self.paragraphs[..=end]
            .iter()
            .rev()
            .map(String::as_str)
            .find(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Table};
    use crate::outline::RuleSet;

    fn levels(tracker: &HeadingTracker) -> Vec<u8> {
        tracker.stack().iter().map(|h| h.level).collect()
    }

    #[test]
    fn test_stack_pops_same_or_deeper() {
        let mut tracker = HeadingTracker::new();
        tracker.push("1. 目的", 1);
        tracker.push("安全", 1);
        assert_eq!(tracker.path(), "2. 安全");
        tracker.push("个人防护", 2);
        tracker.push("手套", 3);
        assert_eq!(tracker.path(), "2. 安全 > 2.1 个人防护 > 2.1.1 手套");
        tracker.push("车辆", 2);
        assert_eq!(tracker.path(), "2. 安全 > 2.2 车辆");
        assert_eq!(levels(&tracker), vec![1, 2]);
    }

    #[test]
    fn test_stale_ancestor_closed() {
        let mut tracker = HeadingTracker::new();
        tracker.push("1. 目的", 1);
        tracker.push("2.1 适用范围", 2);
        assert_eq!(tracker.path(), "2.1 适用范围");
        assert_eq!(tracker.leaf().unwrap().numbers, vec![2, 1]);
    }

    #[test]
    fn test_local_number_keeps_ancestors() {
        let mut tracker = HeadingTracker::new();
        tracker.push("5. 活动描述", 1);
        tracker.push("5.1 入库", 2);
        tracker.push("1) 卸货", 3);
        assert_eq!(tracker.path(), "5. 活动描述 > 5.1 入库 > 1) 卸货");
    }

    #[test]
    fn test_levels_strictly_increase() {
        let mut tracker = HeadingTracker::new();
        let headings = [
            ("3.1.2 a", 3),
            ("b", 1),
            ("c", 4),
            ("3.2 d", 2),
            ("e", 2),
            ("f", 5),
            ("7 g", 1),
        ];
        for (text, level) in headings {
            tracker.push(text, level);
            let lv = levels(&tracker);
            assert!(lv.windows(2).all(|w| w[0] < w[1]), "{:?}", lv);
        }
    }

    #[test]
    fn test_path_leaf() {
        assert_eq!(path_leaf("5. 活动 > 5.1 入库"), "5.1 入库");
        assert_eq!(path_leaf("5. 活动"), "5. 活动");
        assert_eq!(path_leaf(""), "");
    }

    #[test]
    fn test_position_index() {
        let rules = RuleSet::default();
        let classifier = HeadingClassifier::new(&rules, 10);
        let blocks = vec![
            Block::Paragraph(Paragraph::with_text("仓库管理")),
            Block::Table(Table::from_grid([vec!["a"]])),
            Block::Paragraph(Paragraph::with_text("1. 目的")),
            Block::Paragraph(Paragraph::with_text("正文")),
            Block::Paragraph(Paragraph::with_text("2.1 适用范围")),
            Block::Table(Table::from_grid([vec!["b"]])),
        ];
        let index = PositionIndex::build(&blocks, &classifier, &HashSet::new());

        assert_eq!(index.table_path(0), None);
        assert_eq!(index.table_path(1), Some("2.1 适用范围"));
        assert_eq!(index.table_path(7), None);
        assert_eq!(index.paragraphs, vec!["", "1. 目的", "1. 目的", "2.1 适用范围"]);
        assert_eq!(index.section_at(0), None);
        assert_eq!(index.section_at(2), Some("1. 目的"));
        assert_eq!(index.section_at(99), Some("2.1 适用范围"));
    }
}
