//! JSON rendering of the outline.

use crate::error::{Error, Result};
use crate::outline::Outline;
use std::path::Path;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert an outline to JSON.
pub fn to_json(outline: &Outline, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(outline),
        JsonFormat::Compact => serde_json::to_string(outline),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Read an outline written by [`to_json`].
pub fn outline_from_json(json: &str) -> Result<Outline> {
    Ok(serde_json::from_str(json)?)
}

/// Read an outline from a `.json` file.
pub fn read_outline<P: AsRef<Path>>(path: P) -> Result<Outline> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(Error::Config(format!("{} is not a .json file", path.display())));
    }
    outline_from_json(&std::fs::read_to_string(path)?)
}

/// JSON output file name for a document stem.
pub fn json_file_name(stem: &str) -> String {
    format!("{}.json", stem)
}
