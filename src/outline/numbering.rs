//! Section numbering.

use super::classifier::match_text;
use regex::Regex;
use std::sync::OnceLock;

fn explicit_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)*)").unwrap())
}

/// A heading after numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedHeading {
    /// Display title, e.g. `"5.1 成品酒入库检查"`
    pub title: String,
    /// Section number components, e.g. `[5, 1]`
    pub numbers: Vec<u32>,
    /// Heading level
    pub level: u8,
}

/// Per-level counter stack that numbers headings.
///
/// Explicit numbers in the text resynchronise the counters; unnumbered
/// headings take the next number at their level.
#[derive(Debug, Clone, Default)]
pub struct SectionNumbering {
    counters: Vec<u32>,
}

impl SectionNumbering {
    /// Create an empty counter stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values.
    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    /// Number a heading and advance the counters.
    pub fn assign(&mut self, raw: &str, level: u8) -> NumberedHeading {
        let title = raw.trim();
        let normalized = match_text(title);

        // A component that overflows makes the whole number unusable.
        let explicit: Option<Vec<u32>> = explicit_number()
            .captures(&normalized)
            .and_then(|caps| caps[1].split('.').map(|n| n.parse().ok()).collect());

        if let Some(explicit) = explicit.filter(|numbers| !numbers.is_empty()) {
            self.counters = explicit.clone();
            return NumberedHeading {
                title: title.to_string(),
                numbers: explicit,
                level,
            };
        }

        // Truncation resets the deeper levels before the increment.
        self.counters.resize(level.max(1) as usize, 0);
        if let Some(last) = self.counters.last_mut() {
            *last = last.saturating_add(1);
        }
        let numbers = self.counters.clone();

        let title = if title.starts_with(|c: char| c.is_ascii_digit()) {
            title.to_string()
        } else {
            format!("{} {}", format_number(&numbers), title)
        };

        NumberedHeading {
            title,
            numbers,
            level,
        }
    }
}

/// `[5]` → `"5."`, `[5, 1]` → `"5.1"`.
pub fn format_number(numbers: &[u32]) -> String {
    let joined = numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".");
    if numbers.len() == 1 {
        format!("{}.", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_numbering() {
        let mut numbering = SectionNumbering::new();
        assert_eq!(numbering.assign("目的", 1).title, "1. 目的");
        assert_eq!(numbering.assign("适用范围", 1).title, "2. 适用范围");
        assert_eq!(numbering.assign("入库", 2).title, "2.1 入库");
        assert_eq!(numbering.assign("检查", 2).title, "2.2 检查");
        assert_eq!(numbering.assign("职责", 1).title, "3. 职责");
        assert_eq!(numbering.counters(), &[3]);
    }

    #[test]
    fn test_explicit_numbers_resync() {
        let mut numbering = SectionNumbering::new();
        let h = numbering.assign("5.1 成品酒入库检查", 2);
        assert_eq!(h.title, "5.1 成品酒入库检查");
        assert_eq!(h.numbers, vec![5, 1]);

        let next = numbering.assign("外观检查", 2);
        assert_eq!(next.title, "5.2 外观检查");
        assert_eq!(next.numbers, vec![5, 2]);

        let deeper = numbering.assign("瓶口", 3);
        assert_eq!(deeper.title, "5.2.1 瓶口");
    }

    #[test]
    fn test_shallower_heading_truncates() {
        let mut numbering = SectionNumbering::new();
        numbering.assign("7.4.3 隔离", 3);
        let h = numbering.assign("附录", 1);
        assert_eq!(h.numbers, vec![8]);
        assert_eq!(h.title, "8. 附录");
    }

    #[test]
    fn test_deep_heading_without_parent_pads() {
        let mut numbering = SectionNumbering::new();
        let h = numbering.assign("细则", 2);
        assert_eq!(h.numbers, vec![0, 1]);
        assert_eq!(h.title, "0.1 细则");
    }

    #[test]
    fn test_full_width_explicit_number() {
        let mut numbering = SectionNumbering::new();
        let h = numbering.assign("３．２ 储存", 2);
        assert_eq!(h.numbers, vec![3, 2]);
        assert_eq!(h.title, "３．２ 储存");
    }

    #[test]
    fn test_counter_saturates_at_max() {
        let mut numbering = SectionNumbering::new();
        numbering.assign("4294967295. 目的", 1);
        let h = numbering.assign("适用范围", 1);
        assert_eq!(h.numbers, vec![u32::MAX]);
    }

    #[test]
    fn test_oversized_component_is_not_explicit() {
        let mut numbering = SectionNumbering::new();
        numbering.assign("3. 安全要求", 1);
        let h = numbering.assign("99999999999.2 x", 2);
        assert_eq!(h.numbers, vec![3, 1]);
        assert_eq!(h.title, "99999999999.2 x");
        assert_eq!(numbering.counters(), &[3, 1]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(&[5]), "5.");
        assert_eq!(format_number(&[5, 1, 2]), "5.1.2");
    }
}
