//! Word document converter implementation.

use crate::detect::validate_docx_path;
use crate::error::{Error, Result};
use crate::model::Document;
use crate::outline::{chunk_document, ChunkSet, ImageRecord, ProcessOptions};
use crate::parser::DocxParser;
use crate::render::{csv_file_name, json_file_name, to_json, write_csv, ProcessReport};
use std::fs;
use std::path::Path;

use super::DocumentConverter;

/// `.docx` converter.
///
/// Parses the package, runs the inference core and writes images, the
/// chunk CSV and the JSON outline as the options ask.
#[derive(Debug, Clone, Default)]
pub struct DocxConverter {
    _private: (),
}

impl DocxConverter {
    /// Create a new converter.
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn parse(&self, path: &Path, options: &ProcessOptions) -> Result<Document> {
        validate_docx_path(path)?;
        DocxParser::open_with_options(path, options.parse.clone())?.parse()
    }
}

impl DocumentConverter for DocxConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn chunk(&self, path: &Path, options: &ProcessOptions) -> Result<ChunkSet> {
        let document = self.parse(path, options)?;
        Ok(chunk_document(&document, &file_stem(path), options))
    }

    fn chunk_bytes(&self, bytes: &[u8], stem: &str, options: &ProcessOptions) -> Result<ChunkSet> {
        let document = DocxParser::from_bytes_with_options(bytes, options.parse.clone())?.parse()?;
        Ok(chunk_document(&document, stem, options))
    }

    fn process(&self, path: &Path, output_dir: &Path, options: &ProcessOptions) -> Result<ProcessReport> {
        let document = self.parse(path, options)?;
        let stem = file_stem(path);
        let set = chunk_document(&document, &stem, options);

        if set.is_empty() {
            return Err(Error::NoChunks(path.display().to_string()));
        }

        fs::create_dir_all(output_dir)?;
        let mut report = ProcessReport::new(path, set.identity.clone(), set.stats.clone());

        if options.write_images && !set.images.is_empty() {
            let dir = options.resolve_image_dir(output_dir);
            report.images_written = write_images(&document, &set.images, &dir)?;
            report.image_dir = Some(dir);
        }

        if options.write_csv {
            let csv_path = output_dir.join(csv_file_name(&stem));
            write_csv(&csv_path, &set, options.csv_layout)?;
            report.csv_path = Some(csv_path);
        }

        if options.write_json {
            let json_path = output_dir.join(json_file_name(&stem));
            fs::write(&json_path, to_json(&set.outline, options.json_format)?)?;
            log::info!("wrote outline to {}", json_path.display());
            report.json_path = Some(json_path);
        }

        Ok(report)
    }
}

/// Write the media of each record under its output file name.
///
/// Records whose media part was not loaded are skipped with a warning.
/// Returns the number of files written.
pub fn write_images(document: &Document, records: &[ImageRecord], dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;

    let mut written = 0;
    for record in records {
        match document.get_resource(&record.rel_id) {
            Some(resource) if !resource.data.is_empty() => {
                fs::write(dir.join(&record.filename), &resource.data)?;
                written += 1;
            }
            _ => log::warn!("no media for {} ({}), not written", record.filename, record.rel_id),
        }
    }

    log::info!("wrote {} images to {}", written, dir.display());
    Ok(written)
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
