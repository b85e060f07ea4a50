//! Heading classification.
//!
//! A paragraph is a heading when one of these signals fires, strongest
//! first:
//!
//! 1. a declared heading style (`Heading 2`, `heading 2`, `标题 2`, `H2`);
//! 2. a dotted numeral prefix (`3.1.2`), level = segments, or `4)`, level 1;
//! 3. a canonical section name once numbering is stripped, or a `N.` line
//!    carrying a looser heading keyword, both level 1.
//!
//! Paragraphs whose text equals a recorded image caption are never headings.

use super::RuleSet;
use crate::model::{is_title_style_name, Paragraph};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn style_level_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?i)heading\s*(\d+)").unwrap(),
            Regex::new(r"标题\s*(\d+)").unwrap(),
            Regex::new(r"(?i)^h(\d+)$").unwrap(),
        ]
    })
}

fn dotted_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)+)").unwrap())
}

fn paren_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\)").unwrap())
}

fn dot_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.").unwrap())
}

fn leading_numbering() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d.)、\s]+").unwrap())
}

/// Fold full-width digits and punctuation so `１．目的` reads as `1.目的`.
pub(crate) fn match_text(text: &str) -> String {
    text.trim().nfkc().collect()
}

/// Decides whether paragraphs are headings and at what level.
#[derive(Debug, Clone)]
pub struct HeadingClassifier<'a> {
    rules: &'a RuleSet,
    max_depth: u8,
}

impl<'a> HeadingClassifier<'a> {
    /// Create a classifier over a rule set.
    pub fn new(rules: &'a RuleSet, max_depth: u8) -> Self {
        Self {
            rules,
            max_depth: max_depth.max(1),
        }
    }

    /// Heading level of a paragraph, honouring caption exclusion.
    pub fn classify(&self, paragraph: &Paragraph, captions: &HashSet<String>) -> Option<u8> {
        if captions.contains(paragraph.trimmed()) {
            return None;
        }
        self.signal_level(paragraph)
    }

    /// Heading level from formatting and text signals alone.
    pub fn signal_level(&self, paragraph: &Paragraph) -> Option<u8> {
        self.level_of(&paragraph.text, paragraph.style.as_deref())
    }

    /// Heading level of raw text with an optional style name.
    pub fn level_of(&self, text: &str, style: Option<&str>) -> Option<u8> {
        if text.trim().is_empty() {
            return None;
        }
        let normalized = match_text(text);

        if let Some(level) = style.and_then(|s| self.style_level(s, &normalized)) {
            return Some(level);
        }

        if let Some(level) = numeric_level(&normalized) {
            return Some(self.clamp(level));
        }

        if self.keyword_heading(&normalized) {
            return Some(1);
        }

        None
    }

    fn style_level(&self, style: &str, normalized: &str) -> Option<u8> {
        let style = style.trim();
        if is_title_style_name(style) {
            return None;
        }

        let declared = style_level_patterns()
            .iter()
            .find_map(|re| re.captures(style))
            .and_then(|caps| caps[1].parse::<usize>().ok());
        if let Some(n) = declared {
            return Some(self.clamp(n));
        }

        // Heading-family style without a number: fall back to the text.
        if style.to_lowercase().contains("heading") || style.contains("标题") {
            return Some(numeric_level(normalized).map_or(1, |l| self.clamp(l)));
        }

        None
    }

    fn keyword_heading(&self, normalized: &str) -> bool {
        let stripped = leading_numbering().replace(normalized, "");
        let stripped = stripped.trim();

        if self.rules.is_canonical_heading(stripped) {
            return true;
        }

        dot_prefix().is_match(normalized) && self.rules.has_loose_keyword(stripped)
    }

    fn clamp(&self, level: usize) -> u8 {
        level.clamp(1, self.max_depth as usize) as u8
    }
}

/// Level implied by a leading numeral: `3.1.2` → 3, `4)` → 1.
///
/// A bare `4.` does not count on its own; the keyword rules decide those.
fn numeric_level(normalized: &str) -> Option<usize> {
    if let Some(caps) = dotted_prefix().captures(normalized) {
        return Some(caps[1].matches('.').count() + 1);
    }
    if paren_prefix().is_match(normalized) {
        return Some(1);
    }
    None
}
