//! Declarative attribution rules.
//!
//! Every domain phrase the inference engine reacts to lives here rather than
//! in control flow: heading keywords, table content signatures, image caption
//! keywords and ordinal bands. The defaults follow the Chinese SOP template;
//! a JSON file with the same shape replaces them wholesale (missing keys keep
//! their defaults).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maps a table to a canonical section when all phrases occur in its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRule {
    /// Phrases that must all be present
    pub all_of: Vec<String>,
    /// Section path assigned to the table
    pub section: String,
}

impl TableRule {
    /// Create a rule from phrases and a target section.
    pub fn new<S: Into<String>>(all_of: impl IntoIterator<Item = S>, section: impl Into<String>) -> Self {
        Self {
            all_of: all_of.into_iter().map(Into::into).collect(),
            section: section.into(),
        }
    }

    /// Check if the table text carries every phrase.
    pub fn matches(&self, content: &str) -> bool {
        !self.all_of.is_empty() && self.all_of.iter().all(|p| content.contains(p.as_str()))
    }
}

/// Maps a caption to a section when any phrase occurs in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRule {
    /// Caption phrases, any of which selects the rule
    pub any_of: Vec<String>,
    /// Substring the receiving chunk's section path must contain
    pub section: String,
}

impl ImageRule {
    /// Create a rule from phrases and a section substring.
    pub fn new<S: Into<String>>(any_of: impl IntoIterator<Item = S>, section: impl Into<String>) -> Self {
        Self {
            any_of: any_of.into_iter().map(Into::into).collect(),
            section: section.into(),
        }
    }

    /// Check if the caption mentions any phrase.
    pub fn matches(&self, caption: &str) -> bool {
        self.any_of.iter().any(|p| caption.contains(p.as_str()))
    }
}

/// Positional band for images without any caption.
///
/// Image ordinals (1-based, document order) in `from..=to` go to the first
/// chunk whose section path contains one of `sections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBand {
    /// First ordinal of the band
    pub from: usize,
    /// Last ordinal of the band; open-ended when absent
    #[serde(default)]
    pub to: Option<usize>,
    /// Section number markers, e.g. `"3."`
    pub sections: Vec<String>,
}

impl ImageBand {
    /// Check if an ordinal falls in the band.
    pub fn contains(&self, ordinal: usize) -> bool {
        ordinal >= self.from && self.to.map_or(true, |to| ordinal <= to)
    }

    /// Check if a section path belongs to the band.
    pub fn accepts(&self, section_path: &str) -> bool {
        self.sections.iter().any(|s| section_path.contains(s.as_str()))
    }
}

/// The full rule table used by classification and binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Exact top-level section names (compared after stripping numbering)
    pub canonical_headings: Vec<String>,

    /// Keywords that make a `N.`-prefixed line a top-level heading
    pub loose_heading_keywords: Vec<String>,

    /// Content signatures for tables with no positional section
    pub table_rules: Vec<TableRule>,

    /// Caption keywords for image binding
    pub image_rules: Vec<ImageRule>,

    /// Ordinal bands for images without captions
    pub image_bands: Vec<ImageBand>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let canonical = [
            "目的",
            "适用范围",
            "安全和环境要求",
            "环境和安全说明",
            "安全要求",
            "相关文件",
            "职责",
            "定义和缩写",
            "活动描叙",
            "活动描述",
            "具体操作如下",
            "附录",
            "历史纪录",
            "Purpose",
            "Scope",
            "Safety and Environment Requirements",
            "Related Documents",
            "Responsibilities",
            "Definitions and Abbreviations",
            "Activity Description",
            "Appendix",
            "Historical Records",
        ];
        let loose = [
            "目的",
            "适用范围",
            "职责",
            "活动描述",
            "相关文件",
            "定义",
            "附录",
            "历史",
            "记录",
            "规程",
            "说明",
            "注意事项",
            "安全",
            "purpose",
            "scope",
            "responsibilit",
            "activity description",
            "related document",
            "definition",
            "appendix",
            "history",
            "record",
            "procedure",
            "notes",
        ];

        Self {
            canonical_headings: canonical.iter().map(|s| s.to_string()).collect(),
            loose_heading_keywords: loose.iter().map(|s| s.to_string()).collect(),
            table_rules: vec![
                TableRule::new(["分类", "危险源", "控制措施"], "3.1 风险识别"),
                TableRule::new(["相关模块", "危险源", "控制措施"], "3.2 关键控制点"),
                TableRule::new(["PPE矩阵", "风险评估"], "3.2 关键控制点"),
                TableRule::new(["仓库利用率", "劳动生产率"], "6.定义和缩写"),
                TableRule::new(["版本", "作者", "日期"], "8.历史文件记录"),
            ],
            image_rules: vec![
                ImageRule::new(["配送模式"], "配送模式"),
                ImageRule::new(["自提模式"], "自提模式"),
            ],
            image_bands: vec![
                ImageBand {
                    from: 1,
                    to: Some(2),
                    sections: vec!["1.".into(), "2.".into()],
                },
                ImageBand {
                    from: 3,
                    to: Some(5),
                    sections: vec!["3.".into(), "4.".into()],
                },
                ImageBand {
                    from: 6,
                    to: None,
                    sections: vec!["5.".into(), "6.".into()],
                },
            ],
        }
    }
}

impl RuleSet {
    /// Create the default rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule set that never matches anything.
    pub fn empty() -> Self {
        Self {
            canonical_headings: Vec::new(),
            loose_heading_keywords: Vec::new(),
            table_rules: Vec::new(),
            image_rules: Vec::new(),
            image_bands: Vec::new(),
        }
    }

    /// Parse a rule set from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid rule set: {}", e)))
    }

    /// Load a rule set from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read rule file {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Check if a numbering-stripped line is a canonical section name.
    pub fn is_canonical_heading(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty()
            && self
                .canonical_headings
                .iter()
                .any(|k| k == text || k.to_lowercase() == text.to_lowercase())
    }

    /// Check if a line mentions any loose heading keyword.
    pub fn has_loose_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.loose_heading_keywords
            .iter()
            .any(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
    }

    /// Canonical section for a table, judged by its text.
    pub fn table_section(&self, content: &str) -> Option<&str> {
        self.table_rules
            .iter()
            .find(|r| r.matches(content))
            .map(|r| r.section.as_str())
    }

    /// First image rule selected by a caption.
    pub fn image_rule(&self, caption: &str) -> Option<&ImageRule> {
        if caption.is_empty() {
            return None;
        }
        self.image_rules.iter().find(|r| r.matches(caption))
    }

    /// Band containing an image ordinal.
    pub fn band_for(&self, ordinal: usize) -> Option<&ImageBand> {
        self.image_bands.iter().find(|b| b.contains(ordinal))
    }
}
