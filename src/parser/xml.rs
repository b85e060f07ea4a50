//! Readers for the small OOXML side parts: relationships, styles and
//! core properties.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::model::Metadata;

/// A package relationship from `word/_rels/document.xml.rels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Target as written in the relationship (relative to `word/`)
    pub target: String,

    /// Relationship type URI
    pub rel_type: String,

    /// Whether the target lives outside the package
    pub external: bool,
}

impl Relationship {
    /// Check if the relationship points at a picture part.
    pub fn is_image(&self) -> bool {
        self.rel_type.ends_with("/image")
    }

    /// Package part name this relationship resolves to, if internal.
    pub fn part_name(&self) -> Option<String> {
        if self.external {
            return None;
        }
        Some(resolve_part_name("word", &self.target))
    }
}

/// Extract an attribute value by qualified key from an element.
pub(crate) fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Resolve a relationship target against the directory of its source part.
///
/// Absolute targets (`/word/media/x.png`) are taken from the package root;
/// `..` and `.` segments are collapsed.
pub(crate) fn resolve_part_name(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("{}/{}", base_dir.trim_end_matches('/'), target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Parse a relationships part into `Id -> Relationship`.
pub(crate) fn parse_relationships(xml: &str) -> Result<HashMap<String, Relationship>> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let id = get_attr(&e, b"Id");
                let target = get_attr(&e, b"Target");
                if let (Some(id), Some(target)) = (id, target) {
                    let external = get_attr(&e, b"TargetMode")
                        .map(|m| m.eq_ignore_ascii_case("External"))
                        .unwrap_or(false);
                    rels.insert(
                        id,
                        Relationship {
                            target,
                            rel_type: get_attr(&e, b"Type").unwrap_or_default(),
                            external,
                        },
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("relationships: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Parse `word/styles.xml` into `styleId -> display name`.
pub(crate) fn parse_styles(xml: &str) -> Result<HashMap<String, String>> {
    let mut styles = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                current_id = get_attr(&e, b"w:styleId");
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current_id.as_ref(), get_attr(&e, b"w:val")) {
                    styles.insert(id.clone(), name);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                current_id = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("styles: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// Parse `docProps/core.xml` into document metadata.
pub(crate) fn parse_core_properties(xml: &str) -> Result<Metadata> {
    let mut metadata = Metadata::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(t)) => {
                if let Some(name) = current.as_deref() {
                    let value = t
                        .unescape()
                        .map_err(|e| Error::Xml(format!("core properties: {}", e)))?
                        .trim()
                        .to_string();
                    if !value.is_empty() {
                        apply_core_property(&mut metadata, name, value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("core properties: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(metadata)
}

fn apply_core_property(metadata: &mut Metadata, name: &[u8], value: String) {
    match name {
        b"dc:title" => metadata.title = Some(value),
        b"dc:creator" => metadata.author = Some(value),
        b"dc:subject" => metadata.subject = Some(value),
        b"cp:keywords" => metadata.keywords = Some(value),
        b"cp:lastModifiedBy" => metadata.last_modified_by = Some(value),
        b"dcterms:created" => metadata.created = parse_w3c_date(&value),
        b"dcterms:modified" => metadata.modified = parse_w3c_date(&value),
        _ => {}
    }
}

fn parse_w3c_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .ok()
}
