//! Document converter module providing a plugin architecture for input formats.
//!
//! A converter turns one input file into chunks and output files. The
//! registry dispatches on file extensions, so further formats can be added
//! without touching callers.
//!
//! # Example
//!
//! ```no_run
//! use sopchunk::convert::{ConverterRegistry, DocxConverter};
//! use sopchunk::ProcessOptions;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! fn main() -> sopchunk::Result<()> {
//!     let mut registry = ConverterRegistry::new();
//!     registry.register(Arc::new(DocxConverter::new()));
//!
//!     let report = registry.process(
//!         Path::new("procedure.docx"),
//!         Path::new("out"),
//!         &ProcessOptions::default(),
//!     )?;
//!     println!("{:?}", report.csv_path);
//!     Ok(())
//! }
//! ```

mod docx;

pub use docx::{write_images, DocxConverter};
pub(crate) use docx::file_stem;

use crate::error::{Error, Result};
use crate::outline::{ChunkSet, ProcessOptions};
use crate::render::ProcessReport;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trait for document converters.
///
/// Implement this trait to add support for a new input format.
pub trait DocumentConverter: Send + Sync {
    /// Get the supported file extensions for this converter.
    ///
    /// Extensions should be lowercase without the leading dot (e.g., `["docx"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this converter.
    fn name(&self) -> &str;

    /// Chunk a file in memory without writing anything.
    fn chunk(&self, path: &Path, options: &ProcessOptions) -> Result<ChunkSet>;

    /// Chunk document bytes; `stem` stands in for the file name.
    fn chunk_bytes(&self, bytes: &[u8], stem: &str, options: &ProcessOptions) -> Result<ChunkSet>;

    /// Chunk a file and write its outputs under `output_dir`.
    fn process(&self, path: &Path, output_dir: &Path, options: &ProcessOptions) -> Result<ProcessReport>;

    /// Check if this converter supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry for document converters.
///
/// The registry maps file extensions to converters and provides
/// convenient methods for processing documents.
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn DocumentConverter>>,
    by_name: HashMap<String, Arc<dyn DocumentConverter>>,
}

impl ConverterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with default converters (DOCX).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocxConverter::new()));
        registry
    }

    /// Register a converter.
    ///
    /// The converter will be registered for all its supported extensions.
    pub fn register(&mut self, converter: Arc<dyn DocumentConverter>) {
        for ext in converter.supported_extensions() {
            self.converters
                .insert(ext.to_lowercase(), converter.clone());
        }
        self.by_name
            .insert(converter.name().to_lowercase(), converter);
    }

    /// Get a converter by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.converters.get(&ext.to_lowercase()).cloned()
    }

    /// Get a converter by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.converters.contains_key(&ext.to_lowercase())
    }

    /// Get all supported extensions.
    pub fn supported_extensions(&self) -> Vec<&str> {
        self.converters.keys().map(|s| s.as_str()).collect()
    }

    fn converter_for(&self, path: &Path) -> Result<Arc<dyn DocumentConverter>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(format!("{} has no extension", path.display())))?;

        self.get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(format!("no converter for extension '{}'", ext)))
    }

    /// Chunk a file using the appropriate converter.
    pub fn chunk(&self, path: &Path, options: &ProcessOptions) -> Result<ChunkSet> {
        self.converter_for(path)?.chunk(path, options)
    }

    /// Process a file using the appropriate converter.
    pub fn process(&self, path: &Path, output_dir: &Path, options: &ProcessOptions) -> Result<ProcessReport> {
        self.converter_for(path)?.process(path, output_dir, options)
    }

    /// Chunk bytes using the specified extension to determine the converter.
    pub fn chunk_bytes(&self, bytes: &[u8], ext: &str, stem: &str, options: &ProcessOptions) -> Result<ChunkSet> {
        let converter = self
            .get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(format!("no converter for extension '{}'", ext)))?;

        converter.chunk_bytes(bytes, stem, options)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
