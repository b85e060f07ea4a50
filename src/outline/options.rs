//! Processing options and output labels.

use super::RuleSet;
use crate::parser::ParseOptions;
use crate::render::{CsvLayout, JsonFormat, OutputKind};
use std::path::{Path, PathBuf};

/// Default name of the image side directory.
pub const DEFAULT_IMAGE_DIR: &str = "sop_images";

/// Options for turning a document into chunks and output files.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Directory for extracted images; `<output>/sop_images` when unset
    pub image_dir: Option<PathBuf>,

    /// Write image files to disk
    pub write_images: bool,

    /// Write the chunk CSV
    pub write_csv: bool,

    /// Write the JSON outline
    pub write_json: bool,

    /// Columns of the chunk CSV
    pub csv_layout: CsvLayout,

    /// JSON formatting
    pub json_format: JsonFormat,

    /// User-visible literals
    pub labels: Labels,

    /// Paragraphs searched on each side of an image for its caption
    pub caption_window: usize,

    /// Longest plain paragraph still treated as a caption
    pub caption_max_len: usize,

    /// Deepest heading level
    pub max_heading_depth: u8,

    /// Attribution rules
    pub rules: RuleSet,

    /// Package reading options
    pub parse: ParseOptions,
}

impl ProcessOptions {
    /// Create new process options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image directory.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Enable or disable writing image files.
    pub fn with_images(mut self, write: bool) -> Self {
        self.write_images = write;
        self
    }

    /// Enable or disable the CSV output.
    pub fn with_csv(mut self, write: bool) -> Self {
        self.write_csv = write;
        self
    }

    /// Enable or disable the JSON outline output.
    pub fn with_json(mut self, write: bool) -> Self {
        self.write_json = write;
        self
    }

    /// Select CSV and JSON outputs together.
    pub fn with_outputs(mut self, outputs: OutputKind) -> Self {
        self.write_csv = outputs.wants_csv();
        self.write_json = outputs.wants_json();
        self
    }

    /// Set the CSV layout.
    pub fn with_csv_layout(mut self, layout: CsvLayout) -> Self {
        self.csv_layout = layout;
        self
    }

    /// Set the JSON formatting.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Set the label strings.
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Set the caption search window.
    pub fn with_caption_window(mut self, window: usize) -> Self {
        self.caption_window = window;
        self
    }

    /// Set the maximum caption length.
    pub fn with_caption_max_len(mut self, len: usize) -> Self {
        self.caption_max_len = len;
        self
    }

    /// Set the maximum heading depth (1-10).
    pub fn with_max_heading_depth(mut self, depth: u8) -> Self {
        self.max_heading_depth = depth.clamp(1, 10);
        self
    }

    /// Set the attribution rules.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Set package reading options.
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Image directory resolved against an output directory.
    pub fn resolve_image_dir(&self, output_dir: &Path) -> PathBuf {
        match &self.image_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => output_dir.join(dir),
            None => output_dir.join(DEFAULT_IMAGE_DIR),
        }
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            image_dir: None,
            write_images: true,
            write_csv: true,
            write_json: false,
            csv_layout: CsvLayout::ChunkOnly,
            json_format: JsonFormat::Pretty,
            labels: Labels::default(),
            caption_window: 8,
            caption_max_len: 120,
            max_heading_depth: 10,
            rules: RuleSet::default(),
            parse: ParseOptions::default(),
        }
    }
}

/// Literals the pipeline writes into chunk text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    /// Word between a section leaf and the table number
    pub table: String,
    /// Section used when nothing else locates an artifact
    pub unknown_section: String,
    /// Opening of an image block, followed by the file name
    pub image_open: String,
    /// Prefix of the caption line in an image block
    pub caption_prefix: String,
    /// Prefix of the location line under an image block
    pub location_prefix: String,
    /// SOP id used when the file name carries none
    pub unknown_id: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            table: "表格".into(),
            unknown_section: "未知章节".into(),
            image_open: "[图: ".into(),
            caption_prefix: "图片内容：".into(),
            location_prefix: "图片所在SOP位置：".into(),
            unknown_id: "未知".into(),
        }
    }
}

impl Labels {
    /// English labels.
    pub fn english() -> Self {
        Self {
            table: "Table".into(),
            unknown_section: "Unknown Section".into(),
            image_open: "[Image: ".into(),
            caption_prefix: "Image content: ".into(),
            location_prefix: "Location in SOP: ".into(),
            unknown_id: "unknown".into(),
        }
    }
}
