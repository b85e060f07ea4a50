//! Output writers for chunk sets and outlines.

mod cleanup;
mod csv;
mod json;
mod options;
mod result;

pub use self::csv::{
    csv_file_name, to_csv, write_chunks, write_csv, write_flat_csv, write_flat_records, FLAT_HEADERS,
    UTF8_BOM,
};
pub use cleanup::{collapse_blank_lines, normalize_list_markers, LIST_MARKER};
pub use json::{json_file_name, outline_from_json, read_outline, to_json, JsonFormat};
pub use options::{CsvLayout, OutputKind};
pub use result::{ProcessReport, ProcessingStats};
