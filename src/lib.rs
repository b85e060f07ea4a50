//! # sopchunk
//!
//! Structure-aware conversion of SOP Word documents into retrieval-ready
//! chunks.
//!
//! A `.docx` file is read into a flat stream of paragraphs and tables; the
//! outline engine infers the heading hierarchy, numbers the sections,
//! attributes tables and images to them and emits one chunk per section
//! run, with the section path attached.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sopchunk::{process_file, ProcessOptions};
//!
//! fn main() -> sopchunk::Result<()> {
//!     let report = process_file("VPO.WH.001成品酒仓库管理.docx", "out")?;
//!     println!("{} chunks -> {:?}", report.stats.chunk_count, report.csv_path);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Heading inference**: declared styles, dotted numerals and canonical
//!   section names, with automatic numbering
//! - **Table attribution**: by document position, with content rules as a
//!   fallback
//! - **Image binding**: caption search and rule-based placement; no image is
//!   dropped
//! - **Outputs**: BOM-prefixed CSV and a nested JSON outline
//! - **Batch mode**: directories and ZIP archives, optionally in parallel

pub mod batch;
pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod outline;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use batch::{BatchFailure, BatchProcessor, BatchReport};
pub use convert::{ConverterRegistry, DocumentConverter, DocxConverter};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_docx, InputKind};
pub use error::{Error, Result};
pub use model::{
    Block, Document, ImageRef, Metadata, Paragraph, Resource, ResourceType, SopIdentity, Table,
    TableCell, TableRow,
};
pub use outline::{
    chunk_document, BindRule, Chunk, ChunkKind, ChunkSet, FlatRecord, HeadingNode, ImageRecord,
    Labels, Outline, ProcessOptions, RuleSet,
};
pub use parser::{DocxParser, ErrorMode, ParseOptions};
pub use render::{CsvLayout, JsonFormat, OutputKind, ProcessReport, ProcessingStats};

use std::io::Read;
use std::path::Path;

/// Parse a `.docx` file and return its block stream.
///
/// # Example
///
/// ```no_run
/// use sopchunk::parse_file;
///
/// let doc = parse_file("procedure.docx").unwrap();
/// println!("Paragraphs: {}", doc.paragraph_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let parser = DocxParser::open(path)?;
    parser.parse()
}

/// Parse a `.docx` file with custom options.
///
/// # Example
///
/// ```no_run
/// use sopchunk::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new().lenient().with_resources(false);
/// let doc = parse_file_with_options("procedure.docx", options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Document> {
    let parser = DocxParser::open_with_options(path, options)?;
    parser.parse()
}

/// Parse a `.docx` package from bytes.
pub fn parse_bytes(data: &[u8]) -> Result<Document> {
    let parser = DocxParser::from_bytes(data)?;
    parser.parse()
}

/// Parse a `.docx` package from bytes with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Document> {
    let parser = DocxParser::from_bytes_with_options(data, options)?;
    parser.parse()
}

/// Parse a `.docx` package from a reader.
pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
    let parser = DocxParser::from_reader(reader)?;
    parser.parse()
}

/// Extract plain text from a `.docx` file.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let doc = parse_file(path)?;
    Ok(doc.plain_text())
}

/// Chunk a `.docx` file in memory with default options.
///
/// # Example
///
/// ```no_run
/// let set = sopchunk::chunk_file("procedure.docx").unwrap();
/// for chunk in &set.chunks {
///     println!("[{}] {}", chunk.section_path, chunk.text);
/// }
/// ```
pub fn chunk_file<P: AsRef<Path>>(path: P) -> Result<ChunkSet> {
    chunk_file_with_options(path, &ProcessOptions::default())
}

/// Chunk a `.docx` file in memory with custom options.
pub fn chunk_file_with_options<P: AsRef<Path>>(path: P, options: &ProcessOptions) -> Result<ChunkSet> {
    DocxConverter::new().chunk(path.as_ref(), options)
}

/// Process a `.docx` file and write images and the chunk CSV into
/// `output_dir`.
///
/// Fails with [`Error::NoChunks`] when the document yields no chunk.
pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(path: P, output_dir: Q) -> Result<ProcessReport> {
    process_file_with_options(path, output_dir, &ProcessOptions::default())
}

/// Process a `.docx` file with custom options.
pub fn process_file_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    output_dir: Q,
    options: &ProcessOptions,
) -> Result<ProcessReport> {
    DocxConverter::new().process(path.as_ref(), output_dir.as_ref(), options)
}

/// Builder for chunking SOP documents.
///
/// # Example
///
/// ```no_run
/// use sopchunk::{CsvLayout, SopChunker};
///
/// let csv = SopChunker::new()
///     .lenient()
///     .with_csv_layout(CsvLayout::Extended)
///     .chunk("procedure.docx")?
///     .to_csv()?;
/// # Ok::<(), sopchunk::Error>(())
/// ```
pub struct SopChunker {
    options: ProcessOptions,
}

impl SopChunker {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            options: ProcessOptions::default(),
        }
    }

    /// Enable lenient package reading.
    pub fn lenient(mut self) -> Self {
        self.options.parse = self.options.parse.lenient();
        self
    }

    /// Set the CSV layout.
    pub fn with_csv_layout(mut self, layout: CsvLayout) -> Self {
        self.options = self.options.with_csv_layout(layout);
        self
    }

    /// Set the attribution rules.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.options = self.options.with_rules(rules);
        self
    }

    /// Set the label strings.
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.options = self.options.with_labels(labels);
        self
    }

    /// Set the image directory used by [`SopChunker::process`].
    pub fn with_image_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.options = self.options.with_image_dir(dir);
        self
    }

    /// Select the outputs written by [`SopChunker::process`].
    pub fn with_outputs(mut self, outputs: OutputKind) -> Self {
        self.options = self.options.with_outputs(outputs);
        self
    }

    /// Borrow the collected options.
    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Chunk a file in memory.
    pub fn chunk<P: AsRef<Path>>(self, path: P) -> Result<ChunkResult> {
        let set = chunk_file_with_options(path, &self.options)?;
        Ok(ChunkResult {
            set,
            options: self.options,
        })
    }

    /// Chunk document bytes; `stem` names the SOP and the image files.
    pub fn chunk_bytes(self, data: &[u8], stem: &str) -> Result<ChunkResult> {
        let set = DocxConverter::new().chunk_bytes(data, stem, &self.options)?;
        Ok(ChunkResult {
            set,
            options: self.options,
        })
    }

    /// Chunk a file and write its outputs.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(&self, path: P, output_dir: Q) -> Result<ProcessReport> {
        process_file_with_options(path, output_dir, &self.options)
    }
}

impl Default for SopChunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunks of one document plus the options that produced them.
pub struct ChunkResult {
    /// The chunk set
    pub set: ChunkSet,
    options: ProcessOptions,
}

impl ChunkResult {
    /// Render the chunk CSV.
    pub fn to_csv(&self) -> Result<String> {
        render::to_csv(&self.set, self.options.csv_layout)
    }

    /// Render the JSON outline.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.set.outline, format)
    }

    /// Flatten the outline into records.
    pub fn flatten(&self) -> Vec<FlatRecord> {
        self.set.outline.flatten()
    }

    /// Chunks in document order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.set.chunks
    }

    /// Get the outline.
    pub fn outline(&self) -> &Outline {
        &self.set.outline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunker_builder() {
        let chunker = SopChunker::new()
            .lenient()
            .with_csv_layout(CsvLayout::Extended)
            .with_outputs(OutputKind::All);

        assert!(chunker.options().parse.is_lenient());
        assert_eq!(chunker.options().csv_layout, CsvLayout::Extended);
        assert!(chunker.options().write_csv && chunker.options().write_json);
    }

    #[test]
    fn test_chunker_default_outputs() {
        let chunker = SopChunker::default();
        assert!(chunker.options().write_csv);
        assert!(!chunker.options().write_json);
        assert!(chunker.options().write_images);
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_parse_bytes_empty_data() {
        let result = parse_bytes(&[]);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_parse_bytes_legacy_doc() {
        let data = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00];
        assert!(matches!(parse_bytes(&data), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_parse_bytes_truncated_zip() {
        assert!(parse_bytes(b"PK\x03\x04garbage").is_err());
    }

    #[test]
    fn test_process_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_file(dir.path().join("missing.docx"), dir.path());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_chunker_rejects_bad_bytes() {
        assert!(SopChunker::new().chunk_bytes(b"not a docx", "x").is_err());
    }
}
