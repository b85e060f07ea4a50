//! Table rendering and attribution.

use super::tracker::{path_leaf, PositionIndex};
use super::{Labels, RuleSet};
use crate::model::Table;
use std::collections::HashMap;

/// Render a cell grid as a pipe table.
///
/// The first row is the header. Cells are trimmed, `|` is escaped and line
/// breaks become `<br>`; short rows are padded to the widest row.
pub fn render_pipe_table(grid: &[Vec<String>]) -> String {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    if grid.is_empty() || width == 0 {
        return String::new();
    }

    let row_line = |row: &[String]| -> String {
        let cells: Vec<String> = (0..width)
            .map(|i| row.get(i).map(|c| escape_cell(c)).unwrap_or_default())
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(grid.len() + 1);
    lines.push(row_line(&grid[0]));
    lines.push(format!("| {} |", vec!["---"; width].join(" | ")));
    for row in &grid[1..] {
        lines.push(row_line(row));
    }
    lines.join("\n")
}

fn escape_cell(text: &str) -> String {
    text.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// Parse a pipe table back into a cell grid.
///
/// The separator row is dropped and `\|` / `<br>` are unescaped. Lines that
/// are not table rows are ignored.
pub fn parse_pipe_table(text: &str) -> Vec<Vec<String>> {
    let mut grid = Vec::new();
    for line in text.lines().map(str::trim) {
        if !line.starts_with('|') || !line.ends_with('|') || line.len() < 2 {
            continue;
        }
        let cells = split_row(&line[1..line.len() - 1]);
        if is_separator(&cells) {
            continue;
        }
        grid.push(cells);
    }
    grid
}

fn split_row(inner: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
        .into_iter()
        .map(|c| c.trim().replace("<br>", "\n"))
        .collect()
}

fn is_separator(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells
            .iter()
            .all(|c| !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':'))
}

/// A located table ready to become a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTable {
    /// Section path the table belongs to
    pub section_path: String,
    /// Labelled chunk text (`"{leaf} - 表格 {n}"` + pipe table)
    pub text: String,
    /// Pipe table alone
    pub markdown: String,
    /// Whether the path came from the document position
    pub positional: bool,
}

/// Assigns tables to sections and numbers them per section leaf.
#[derive(Debug)]
pub struct TableLocator<'a> {
    positions: &'a PositionIndex,
    rules: &'a RuleSet,
    labels: &'a Labels,
    counters: HashMap<String, usize>,
}

impl<'a> TableLocator<'a> {
    /// Create a locator over a position index.
    pub fn new(positions: &'a PositionIndex, rules: &'a RuleSet, labels: &'a Labels) -> Self {
        Self {
            positions,
            rules,
            labels,
            counters: HashMap::new(),
        }
    }

    /// Locate the table at `ordinal`; blank tables yield nothing.
    pub fn locate(&mut self, ordinal: usize, table: &Table) -> Option<LocatedTable> {
        if table.is_empty() {
            log::debug!("table {} is blank, skipped", ordinal);
            return None;
        }

        let markdown = render_pipe_table(&table.grid());

        let (section_path, positional) = match self.positions.table_path(ordinal) {
            Some(path) => (path.to_string(), true),
            None => match self.rules.table_section(&table.plain_text()) {
                Some(section) => {
                    log::debug!("table {} located by content as '{}'", ordinal, section);
                    (section.to_string(), false)
                }
                None => {
                    log::warn!("table {} has no section, using '{}'", ordinal, self.labels.unknown_section);
                    (self.labels.unknown_section.clone(), false)
                }
            },
        };

        let leaf = path_leaf(&section_path).to_string();
        let counter = self.counters.entry(leaf.clone()).or_insert(0);
        *counter += 1;

        let text = format!("{} - {} {}\n\n{}", leaf, self.labels.table, counter, markdown);

        Some(LocatedTable {
            section_path,
            text,
            markdown,
            positional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    // ==================== Rendering ====================

    #[test]
    fn test_render_pipe_table() {
        let md = render_pipe_table(&grid(&[&["品名", "数量"], &[" 啤酒 ", "10"]]));
        assert_eq!(md, "| 品名 | 数量 |\n| --- | --- |\n| 啤酒 | 10 |");
    }

    #[test]
    fn test_render_pads_and_escapes() {
        let md = render_pipe_table(&grid(&[&["a", "b", "c"], &["x|y"], &["多\n行", "", ""]]));
        assert_eq!(
            md,
            "| a | b | c |\n| --- | --- | --- |\n| x\\|y |  |  |\n| 多<br>行 |  |  |"
        );
        assert_eq!(render_pipe_table(&[]), "");
    }

    #[test]
    fn test_parse_inverts_render() {
        let original = grid(&[
            &["步骤", "说明"],
            &["1", "叉车 | 托盘"],
            &["2", "卸货\n检查"],
        ]);
        let parsed = parse_pipe_table(&render_pipe_table(&original));
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_ignores_prose() {
        let text = "5.1 入库 - 表格 1\n\n| a | b |\n| --- | --- |\n| 1 | 2 |";
        assert_eq!(parse_pipe_table(text), grid(&[&["a", "b"], &["1", "2"]]));
    }

    // ==================== Location ====================

    #[test]
    fn test_positional_path_preferred() {
        let positions = PositionIndex {
            tables: vec!["5. 活动 > 5.1 入库".into()],
            paragraphs: vec![],
        };
        let rules = RuleSet::default();
        let labels = Labels::default();
        let mut locator = TableLocator::new(&positions, &rules, &labels);

        let table = Table::from_grid([vec!["版本", "作者", "日期"]]);
        let located = locator.locate(0, &table).unwrap();
        assert!(located.positional);
        assert_eq!(located.section_path, "5. 活动 > 5.1 入库");
        assert!(located.text.starts_with("5.1 入库 - 表格 1\n\n| 版本 |"));
    }

    #[test]
    fn test_content_rule_then_unknown() {
        let positions = PositionIndex::default();
        let rules = RuleSet::default();
        let labels = Labels::default();
        let mut locator = TableLocator::new(&positions, &rules, &labels);

        let history = Table::from_grid([vec!["版本", "作者", "日期"], vec!["1.0", "张三", "2023-01-01"]]);
        let located = locator.locate(0, &history).unwrap();
        assert_eq!(located.section_path, "8.历史文件记录");
        assert!(!located.positional);

        let other = Table::from_grid([vec!["品名"]]);
        assert_eq!(locator.locate(1, &other).unwrap().section_path, "未知章节");
    }

    #[test]
    fn test_counter_per_leaf() {
        let positions = PositionIndex {
            tables: vec!["2.1 适用范围".into(), "2.1 适用范围".into(), "3. 安全".into()],
            paragraphs: vec![],
        };
        let rules = RuleSet::default();
        let labels = Labels::default();
        let mut locator = TableLocator::new(&positions, &rules, &labels);
        let t = Table::from_grid([vec!["x"]]);

        assert!(locator.locate(0, &t).unwrap().text.starts_with("2.1 适用范围 - 表格 1"));
        assert!(locator.locate(1, &t).unwrap().text.starts_with("2.1 适用范围 - 表格 2"));
        assert!(locator.locate(2, &t).unwrap().text.starts_with("3. 安全 - 表格 1"));
    }

    #[test]
    fn test_blank_table_skipped() {
        let positions = PositionIndex::default();
        let rules = RuleSet::default();
        let labels = Labels::default();
        let mut locator = TableLocator::new(&positions, &rules, &labels);
        assert!(locator.locate(0, &Table::from_grid([vec!["  ", ""]])).is_none());
    }
}
