//! End-to-end tests over synthetic `.docx` packages.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sopchunk::convert::{ConverterRegistry, DocumentConverter};
use sopchunk::render::{read_outline, write_flat_csv, UTF8_BOM};
use sopchunk::{
    chunk_file, process_file, process_file_with_options, BatchProcessor, ChunkSet, CsvLayout,
    Error, OutputKind, ProcessOptions, ProcessReport, Result, SopChunker,
};
use zip::write::SimpleFileOptions;

const PNG: [u8; 10] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

const RELS: &str = r#"<Relationships><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/></Relationships>"#;

const CORE: &str = r#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc"><dc:title>成品酒仓库管理</dc:title><dc:creator>QA</dc:creator></cp:coreProperties>"#;

fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

fn styled(text: &str, style: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
        style, text
    )
}

fn drawing(rel: &str) -> String {
    format!(
        r#"<w:p><w:r><w:drawing><wp:docPr id="1" name="Picture 1"/><a:blip r:embed="{}"/></w:drawing></w:r></w:p>"#,
        rel
    )
}

fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in *row {
            xml.push_str(&format!("<w:tc>{}</w:tc>", paragraph(cell)));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

fn document(body: &[String]) -> String {
    format!(
        r#"<w:document xmlns:w="w" xmlns:r="r" xmlns:a="a" xmlns:wp="wp"><w:body>{}</w:body></w:document>"#,
        body.concat()
    )
}

fn package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        for (name, data) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

fn sop_body() -> String {
    document(&[
        styled("成品酒仓库管理", "Title"),
        paragraph("1. 目的"),
        paragraph("规范成品酒仓库的收发作业"),
        paragraph("2. 职责"),
        paragraph("· 仓库班长负责安排作业"),
        drawing("rId5"),
        paragraph("图1 班组结构"),
        paragraph("3. 安全要求"),
        table(&[&["分类", "危险源", "控制措施"], &["机械", "叉车", "限速行驶"]]),
        paragraph("3.1 个人防护"),
        paragraph("进入仓库须穿戴安全鞋"),
    ])
}

fn sop_package() -> Vec<u8> {
    let body = sop_body();
    package(&[
        ("word/document.xml", body.as_bytes()),
        ("word/_rels/document.xml.rels", RELS.as_bytes()),
        ("word/media/image1.png", &PNG),
        ("docProps/core.xml", CORE.as_bytes()),
    ])
}

fn write_docx(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

/// Read a CSV written with a BOM and return its records, header included.
fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(UTF8_BOM), "missing BOM in {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(&bytes[UTF8_BOM.len()..]);
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// ==================== Process Tests ====================

#[test]
fn test_process_writes_csv_and_images() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "VPO.WH.001成品酒仓库管理.docx", &sop_package());
    let out = dir.path().join("out");

    let report = process_file(&input, &out).unwrap();

    assert_eq!(report.identity.id, "VPO.WH.001");
    assert_eq!(report.identity.name, "成品酒仓库管理");
    assert_eq!(report.images_written, 1);
    assert!(report.json_path.is_none());

    let csv_path = report.csv_path.clone().unwrap();
    assert_eq!(
        csv_path.file_name().unwrap().to_string_lossy(),
        "VPO.WH.001成品酒仓库管理_processed_with_images.csv"
    );

    let rows = read_csv(&csv_path);
    assert_eq!(rows[0], vec!["chunk"]);
    assert_eq!(rows.len() as u32, report.stats.chunk_count + 1);
    assert!(rows[1][0].starts_with("1. 目的"));
    assert!(rows.iter().any(|r| r[0].contains("| 分类 | 危险源 | 控制措施 |")));

    let image = out
        .join("sop_images")
        .join("VPO.WH.001成品酒仓库管理_image_id____image1.png");
    assert_eq!(fs::read(image).unwrap(), PNG);
}

#[test]
fn test_process_extended_layout() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "VPO.WH.001成品酒仓库管理.docx", &sop_package());
    let options = ProcessOptions::new().with_csv_layout(CsvLayout::Extended);

    let report = process_file_with_options(&input, dir.path(), &options).unwrap();
    let rows = read_csv(report.csv_path.as_ref().unwrap());

    assert_eq!(rows[0], vec!["chunk", "sop_id", "sop_name", "section_path", "image_filename"]);
    let duty = rows.iter().find(|r| r[3] == "2. 职责").unwrap();
    assert_eq!(duty[1], "VPO.WH.001");
    assert_eq!(duty[2], "成品酒仓库管理");
    assert_eq!(duty[4], "VPO.WH.001成品酒仓库管理_image_id____image1.png");
    assert!(rows.iter().any(|r| r[3] == "3.1 个人防护"));
}

#[test]
fn test_process_json_outline() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "VPO.WH.001成品酒仓库管理.docx", &sop_package());
    let options = ProcessOptions::new()
        .with_outputs(OutputKind::Json)
        .with_images(false);

    let report = process_file_with_options(&input, dir.path(), &options).unwrap();
    assert!(report.csv_path.is_none());
    assert!(report.image_dir.is_none());

    let json_path = report.json_path.unwrap();
    assert_eq!(
        json_path.file_name().unwrap().to_string_lossy(),
        "VPO.WH.001成品酒仓库管理.json"
    );

    let outline = read_outline(&json_path).unwrap();
    assert_eq!(outline.sop_id, "VPO.WH.001");
    assert_eq!(outline.sop_name, "成品酒仓库管理");
    assert_eq!(outline.sections.len(), 3);
    assert_eq!(outline.sections[2].subsections[0].title, "3.1 个人防护");
    assert_eq!(
        outline.sections[1].images,
        vec!["VPO.WH.001成品酒仓库管理_image_id____image1.png"]
    );
}

#[test]
fn test_flatten_written_outline() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "VPO.WH.001成品酒仓库管理.docx", &sop_package());
    let options = ProcessOptions::new().with_outputs(OutputKind::All);
    let report = process_file_with_options(&input, dir.path(), &options).unwrap();

    let outline = read_outline(report.json_path.unwrap()).unwrap();
    let records = outline.flatten();
    let flat = dir.path().join("flat.csv");
    write_flat_csv(&flat, &records).unwrap();

    let rows = read_csv(&flat);
    assert_eq!(rows[0], vec!["text", "sop_id", "sop_name", "section_path", "image_filenames"]);
    assert_eq!(rows.len(), records.len() + 1);
    let nested = rows.iter().find(|r| r[3] == "3. 安全要求 > 3.1 个人防护").unwrap();
    assert!(nested[0].contains("安全鞋"));
}

// ==================== In-Memory Tests ====================

#[test]
fn test_chunk_file_matches_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let data = sop_package();
    let input = write_docx(dir.path(), "VPO.WH.001成品酒仓库管理.docx", &data);

    let from_file = chunk_file(&input).unwrap();
    let from_bytes = SopChunker::new()
        .chunk_bytes(&data, "VPO.WH.001成品酒仓库管理")
        .unwrap();

    let texts = |set: &ChunkSet| set.texts().map(str::to_string).collect::<Vec<_>>();
    assert_eq!(texts(&from_file), texts(&from_bytes.set));
    assert_eq!(from_file.outline, from_bytes.set.outline);
}

#[test]
fn test_chunker_csv_string() {
    let csv = SopChunker::new()
        .with_csv_layout(CsvLayout::Extended)
        .chunk_bytes(&sop_package(), "VPO.WH.001成品酒仓库管理")
        .unwrap()
        .to_csv()
        .unwrap();
    assert!(csv.contains("section_path"));
    assert!(csv.contains("3.1 个人防护"));
}

// ==================== Failure Tests ====================

#[test]
fn test_document_without_headings_fails() {
    let dir = tempfile::tempdir().unwrap();
    let body = document(&[paragraph("只有正文"), paragraph("没有章节")]);
    let data = package(&[("word/document.xml", body.as_bytes())]);
    let input = write_docx(dir.path(), "X-1.docx", &data);

    let result = process_file(&input, dir.path().join("out"));
    assert!(matches!(result, Err(Error::NoChunks(_))));
    assert!(!dir.path().join("out").join("X-1_processed_with_images.csv").exists());
}

#[test]
fn test_missing_media_is_lenient_by_option() {
    let dir = tempfile::tempdir().unwrap();
    let body = sop_body();
    let data = package(&[
        ("word/document.xml", body.as_bytes()),
        ("word/_rels/document.xml.rels", RELS.as_bytes()),
    ]);
    let input = write_docx(dir.path(), "VPO.WH.002.docx", &data);

    let strict = process_file(&input, dir.path());
    assert!(strict.is_err());

    let mut options = ProcessOptions::new();
    options.parse = options.parse.lenient();
    let report = process_file_with_options(&input, dir.path(), &options).unwrap();
    assert_eq!(report.images_written, 0);
    assert!(report.stats.chunk_count > 0);
}

// ==================== Batch Tests ====================

#[test]
fn test_batch_directory_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = dir.path().join("in");
    fs::create_dir_all(&inputs).unwrap();
    write_docx(&inputs, "VPO.WH.001成品酒仓库管理.docx", &sop_package());
    write_docx(&inputs, "VPO.WH.002出库.docx", &sop_package());
    write_docx(&inputs, "broken.docx", b"not a zip");

    let out = dir.path().join("out");
    for parallel in [false, true] {
        let report = BatchProcessor::new(ProcessOptions::default())
            .with_parallel(parallel)
            .run(&inputs, &out)
            .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert!(report.failures[0].path.ends_with("broken.docx"));
        assert_eq!(report.stats.document_count, 2);
    }

    // Image names are namespaced per document.
    assert!(out.join("sop_images/VPO.WH.001成品酒仓库管理_image_id____image1.png").exists());
    assert!(out.join("sop_images/VPO.WH.002出库_image_id____image1.png").exists());
}

#[test]
fn test_batch_zip_archive() {
    let dir = tempfile::tempdir().unwrap();
    let doc = sop_package();
    let archive_bytes = package(&[
        ("sops/VPO.WH.001成品酒仓库管理.docx", &doc),
        ("sops/readme.txt", b"ignored"),
    ]);
    let archive = write_docx(dir.path(), "sops.zip", &archive_bytes);
    let out = dir.path().join("out");

    let report = BatchProcessor::new(ProcessOptions::default())
        .run(&archive, &out)
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.success_count(), 1);
    assert!(out.join("VPO.WH.001成品酒仓库管理_processed_with_images.csv").exists());
}

// ==================== Registry Tests ====================

/// Converter that reports a fixed chunk count without reading the file.
struct StubConverter;

impl DocumentConverter for StubConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn chunk(&self, _path: &Path, _options: &ProcessOptions) -> Result<ChunkSet> {
        Err(Error::Other("stub chunk".into()))
    }

    fn chunk_bytes(&self, _bytes: &[u8], _stem: &str, _options: &ProcessOptions) -> Result<ChunkSet> {
        Err(Error::Other("stub chunk".into()))
    }

    fn process(&self, path: &Path, _output_dir: &Path, _options: &ProcessOptions) -> Result<ProcessReport> {
        Ok(ProcessReport::new(path, Default::default(), Default::default()))
    }
}

#[test]
fn test_registry_custom_converter() {
    let mut registry = ConverterRegistry::with_defaults();
    registry.register(Arc::new(StubConverter));

    assert!(registry.supports("TXT"));
    assert_eq!(registry.get_by_name("stub").unwrap().name(), "stub");

    let report = registry
        .process(Path::new("notes.txt"), Path::new("unused"), &ProcessOptions::default())
        .unwrap();
    assert!(report.outputs().is_empty());

    let err = registry.chunk(Path::new("notes.txt"), &ProcessOptions::default());
    assert!(matches!(err, Err(Error::Other(_))));
}
