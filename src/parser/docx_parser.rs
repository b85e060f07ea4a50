//! Word document parser built on the ZIP package and quick-xml.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::detect::{detect_format_from_bytes, InputKind};
use crate::error::{Error, Result};
use crate::model::{Block, Document, Metadata, Resource};

use super::body::BodyWalker;
use super::options::ParseOptions;
use super::xml::{parse_core_properties, parse_relationships, parse_styles, Relationship};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PART: &str = "docProps/core.xml";

/// Word (`.docx`) document parser.
///
/// The package bytes are held in memory; [`DocxParser::parse`] can be
/// called repeatedly.
pub struct DocxParser {
    data: Vec<u8>,
    options: ParseOptions,
}

impl DocxParser {
    /// Open a `.docx` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a `.docx` file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_vec(data, options)
    }

    /// Parse a document from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a document from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        Self::from_vec(data.to_vec(), options)
    }

    /// Parse a document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Parse a document from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_vec(data, options)
    }

    fn from_vec(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        match detect_format_from_bytes(&data)? {
            InputKind::LegacyDoc => {
                return Err(Error::UnsupportedFormat(
                    "legacy .doc (OLE2) documents are not supported".into(),
                ))
            }
            InputKind::Docx | InputKind::Archive => {}
        }

        // Fail early on damaged containers and non-Word archives.
        let archive = ZipArchive::new(Cursor::new(data.as_slice()))?;
        if archive.index_for_name(DOCUMENT_PART).is_none() {
            return Err(Error::MissingPart(DOCUMENT_PART.into()));
        }

        Ok(Self { data, options })
    }

    /// Parse the package and return a structured Document.
    pub fn parse(&self) -> Result<Document> {
        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;

        let body_xml = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| Error::MissingPart(DOCUMENT_PART.into()))?;

        let rels = match read_part(&mut archive, DOCUMENT_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let styles = self.secondary(read_part(&mut archive, STYLES_PART), STYLES_PART, |xml| {
            parse_styles(xml)
        })?;

        let blocks = BodyWalker::new(&styles, &rels).walk(&body_xml)?;

        let mut document = Document::from_blocks(blocks);

        if self.options.read_metadata {
            document.metadata = self.secondary(read_part(&mut archive, CORE_PART), CORE_PART, |xml| {
                parse_core_properties(xml)
            })?;
        }

        if self.options.extract_resources {
            self.load_media(&mut archive, &rels, &mut document)?;
        }

        log::debug!(
            "parsed package: {} blocks, {} paragraphs, {} tables, {} images",
            document.blocks.len(),
            document.paragraph_count(),
            document.table_count(),
            document.image_count()
        );

        Ok(document)
    }

    /// Read and parse an optional side part, honouring the error mode.
    fn secondary<T: Default>(
        &self,
        raw: Result<Option<String>>,
        part: &str,
        parse: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        let parsed = raw.and_then(|xml| match xml {
            Some(xml) => parse(&xml),
            None => Ok(T::default()),
        });
        match parsed {
            Ok(v) => Ok(v),
            Err(e) if self.options.is_lenient() => {
                log::warn!("skipping unreadable part {}: {}", part, e);
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    fn load_media(
        &self,
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        rels: &HashMap<String, Relationship>,
        document: &mut Document,
    ) -> Result<()> {
        let wanted: HashSet<String> = document
            .blocks
            .iter()
            .flat_map(|b| match b {
                Block::Paragraph(p) => p.images.iter(),
                Block::Table(t) => t.images.iter(),
            })
            .map(|img| img.rel_id.clone())
            .collect();

        for rel_id in wanted {
            let Some(rel) = rels.get(&rel_id) else {
                log::warn!("image relationship {} not found", rel_id);
                continue;
            };
            let Some(part_name) = rel.part_name() else {
                log::debug!("image {} is linked externally, skipping", rel_id);
                continue;
            };

            match read_binary_part(archive, &part_name) {
                Ok(Some(data)) => {
                    document.add_resource(rel_id, Resource::from_part(&part_name, data));
                }
                Ok(None) if self.options.is_lenient() => {
                    log::warn!("media part {} missing", part_name);
                }
                Ok(None) => return Err(Error::MissingPart(part_name)),
                Err(e) if self.options.is_lenient() => {
                    log::warn!("media part {} unreadable: {}", part_name, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Document metadata without walking the body.
    pub fn metadata(&self) -> Result<Metadata> {
        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;
        match read_part(&mut archive, CORE_PART)? {
            Some(xml) => parse_core_properties(&xml),
            None => Ok(Metadata::default()),
        }
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn read_binary_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::with_capacity(prealloc_capacity(file.size()));
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

/// Upper bound on the buffer reserved from a part's declared size.
const MAX_PREALLOC: u64 = 1 << 24;

fn prealloc_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}
