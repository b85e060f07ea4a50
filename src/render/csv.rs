//! CSV output for chunks and flattened outlines.
//!
//! Files start with a UTF-8 byte-order mark so spreadsheet tools detect the
//! encoding, and every field is quoted because chunk text carries newlines.

use super::CsvLayout;
use crate::error::Result;
use crate::outline::{ChunkSet, FlatRecord};
use ::csv::{QuoteStyle, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header of the flattened-outline CSV.
pub const FLAT_HEADERS: [&str; 5] = ["text", "sop_id", "sop_name", "section_path", "image_filenames"];

/// Chunk CSV file name for a document stem.
pub fn csv_file_name(stem: &str) -> String {
    format!("{}_processed_with_images.csv", stem)
}

/// Write the chunks of a document.
pub fn write_chunks<W: Write>(mut writer: W, set: &ChunkSet, layout: CsvLayout) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv.write_record(layout.headers())?;
    for chunk in &set.chunks {
        match layout {
            CsvLayout::ChunkOnly => csv.write_record([chunk.text.as_str()])?,
            CsvLayout::Extended => {
                let images = chunk.image_list();
                csv.write_record([
                    chunk.text.as_str(),
                    set.identity.id.as_str(),
                    set.identity.name.as_str(),
                    chunk.section_path.as_str(),
                    images.as_str(),
                ])?
            }
        }
    }
    csv.flush()?;
    Ok(())
}

/// Render the chunk CSV to a string (BOM included).
pub fn to_csv(set: &ChunkSet, layout: CsvLayout) -> Result<String> {
    let mut buf = Vec::new();
    write_chunks(&mut buf, set, layout)?;
    String::from_utf8(buf).map_err(|e| crate::error::Error::Render(e.to_string()))
}

/// Write the chunk CSV to a file.
pub fn write_csv<P: AsRef<Path>>(path: P, set: &ChunkSet, layout: CsvLayout) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_chunks(BufWriter::new(file), set, layout)?;
    log::info!("wrote {} chunks to {}", set.chunks.len(), path.as_ref().display());
    Ok(())
}

/// Write flattened outline records.
pub fn write_flat_records<W: Write>(mut writer: W, records: &[FlatRecord]) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv.write_record(FLAT_HEADERS)?;
    for record in records {
        let images = record.image_filenames.join(",");
        csv.write_record([
            record.text.as_str(),
            record.sop_id.as_str(),
            record.sop_name.as_str(),
            record.section_path.as_str(),
            images.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write flattened outline records to a file.
pub fn write_flat_csv<P: AsRef<Path>>(path: P, records: &[FlatRecord]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_flat_records(BufWriter::new(file), records)
}
