//! Output layout options.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Columns written to the chunk CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvLayout {
    /// A single `chunk` column
    #[default]
    ChunkOnly,
    /// `chunk, sop_id, sop_name, section_path, image_filename`
    Extended,
}

impl CsvLayout {
    /// Header row for this layout.
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            CsvLayout::ChunkOnly => &["chunk"],
            CsvLayout::Extended => &["chunk", "sop_id", "sop_name", "section_path", "image_filename"],
        }
    }
}

impl fmt::Display for CsvLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvLayout::ChunkOnly => f.write_str("chunk"),
            CsvLayout::Extended => f.write_str("extended"),
        }
    }
}

impl FromStr for CsvLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chunk" | "chunk-only" | "chunkonly" => Ok(CsvLayout::ChunkOnly),
            "extended" | "full" => Ok(CsvLayout::Extended),
            other => Err(Error::Config(format!("unknown CSV layout '{}'", other))),
        }
    }
}

/// Output formats written for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// Chunk CSV only
    #[default]
    Csv,
    /// JSON outline only
    Json,
    /// Both
    All,
}

impl OutputKind {
    /// Check if the chunk CSV is written.
    pub fn wants_csv(&self) -> bool {
        matches!(self, OutputKind::Csv | OutputKind::All)
    }

    /// Check if the JSON outline is written.
    pub fn wants_json(&self) -> bool {
        matches!(self, OutputKind::Json | OutputKind::All)
    }
}

impl FromStr for OutputKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputKind::Csv),
            "json" => Ok(OutputKind::Json),
            "all" | "both" => Ok(OutputKind::All),
            other => Err(Error::Config(format!("unknown output format '{}'", other))),
        }
    }
}
