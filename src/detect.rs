//! Input format detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Kind of input the pipeline was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Office Open XML word-processing package (`.docx`)
    Docx,
    /// Plain ZIP archive that may contain `.docx` files
    Archive,
    /// Legacy binary Word document (`.doc`), recognised but not readable
    LegacyDoc,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Docx => write!(f, "Word document (.docx)"),
            InputKind::Archive => write!(f, "ZIP archive"),
            InputKind::LegacyDoc => write!(f, "legacy Word document (.doc)"),
        }
    }
}

/// ZIP local file header magic: PK\x03\x04
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE2 compound document magic used by legacy `.doc` files.
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Detect the input kind from a file path.
///
/// The magic bytes decide between a ZIP container and a legacy OLE2
/// document; the extension then separates a `.docx` package from a plain
/// archive of documents.
///
/// # Example
/// ```no_run
/// use sopchunk::detect::{detect_format_from_path, InputKind};
///
/// let kind = detect_format_from_path("procedure.docx").unwrap();
/// assert_eq!(kind, InputKind::Docx);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<InputKind> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = Vec::with_capacity(8);
    reader.by_ref().take(8).read_to_end(&mut header)?;

    let magic = detect_format_from_bytes(&header)?;
    let ext = extension_of(path);

    match magic {
        InputKind::LegacyDoc => Ok(InputKind::LegacyDoc),
        _ if ext == "zip" => Ok(InputKind::Archive),
        _ => Ok(InputKind::Docx),
    }
}

/// Detect the input kind from leading bytes.
///
/// ZIP data is reported as [`InputKind::Docx`]; telling a package apart
/// from a plain archive needs the entry list or the file name.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<InputKind> {
    if data.starts_with(OLE_MAGIC) {
        return Ok(InputKind::LegacyDoc);
    }
    if data.starts_with(ZIP_MAGIC) {
        return Ok(InputKind::Docx);
    }
    Err(Error::UnknownFormat)
}

/// Validate that a path names a readable `.docx` file.
///
/// Missing files, wrong extensions and legacy `.doc` content are all
/// rejected before any parsing happens.
pub fn validate_docx_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }

    let ext = extension_of(path);
    match ext.as_str() {
        "docx" => {}
        "doc" => {
            return Err(Error::UnsupportedFormat(
                "legacy .doc files must be saved as .docx first".into(),
            ))
        }
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "expected a .docx file, got extension '{}'",
                other
            )))
        }
    }

    match detect_format_from_path(path)? {
        InputKind::LegacyDoc => Err(Error::UnsupportedFormat(
            "file has a .docx extension but legacy .doc content".into(),
        )),
        _ => Ok(()),
    }
}

/// Check if a file looks like a `.docx` package.
pub fn is_docx<P: AsRef<Path>>(path: P) -> bool {
    validate_docx_path(path).is_ok()
}

/// Check if bytes start like a ZIP-based package.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    matches!(detect_format_from_bytes(data), Ok(InputKind::Docx))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}
