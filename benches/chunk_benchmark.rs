//! Benchmarks for sopchunk structure inference.
//!
//! Run with: cargo bench
//!
//! These benchmarks run the inference core over synthetic block streams,
//! so package reading is excluded.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sopchunk::detect::detect_format_from_bytes;
use sopchunk::{
    chunk_document, Block, Document, ImageRef, Paragraph, ProcessOptions, Resource, Table,
};

/// Creates a synthetic SOP with the given number of top-level sections.
fn create_test_document(section_count: usize) -> Document {
    let mut blocks = vec![Block::Paragraph(Paragraph::styled("仓库管理规程", "Title"))];
    let mut doc_images = Vec::new();

    for s in 1..=section_count {
        blocks.push(Block::Paragraph(Paragraph::with_text(format!("{}. 第{}章", s, s))));
        for sub in 1..=3 {
            blocks.push(Block::Paragraph(Paragraph::with_text(format!("{}.{} 条款", s, sub))));
            for line in 0..4 {
                blocks.push(Block::Paragraph(Paragraph::with_text(format!(
                    "· 第{}行作业要求，按规程执行并记录",
                    line
                ))));
            }
        }

        if s % 2 == 0 {
            let rel = format!("rId{}", s);
            blocks.push(Block::Paragraph(
                Paragraph::new().with_image(ImageRef::new(rel.clone()).with_target("media/a.png")),
            ));
            blocks.push(Block::Paragraph(Paragraph::with_text(format!("图{} 作业示意", s / 2))));
            doc_images.push(rel);
        }

        if s % 3 == 0 {
            blocks.push(Block::Table(Table::from_grid([
                vec!["分类", "危险源", "控制措施"],
                vec!["机械", "叉车", "限速"],
                vec!["电气", "充电区", "绝缘"],
            ])));
        }
    }

    let mut doc = Document::from_blocks(blocks);
    for rel in doc_images {
        doc.add_resource(rel, Resource::image(vec![0x89, b'P', b'N', b'G'], "image/png"));
    }
    doc
}

fn bench_format_detection(c: &mut Criterion) {
    let zip = b"PK\x03\x04\x14\x00\x06\x00";
    let ole = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

    c.bench_function("detect_docx", |b| {
        b.iter(|| detect_format_from_bytes(black_box(zip)))
    });

    c.bench_function("detect_legacy_doc", |b| {
        b.iter(|| detect_format_from_bytes(black_box(ole)))
    });
}

fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_document");
    let options = ProcessOptions::default();

    for section_count in [5, 20, 100] {
        let doc = create_test_document(section_count);
        group.bench_function(format!("{}_sections", section_count), |b| {
            b.iter(|| chunk_document(black_box(&doc), "VPO.WH.001仓库管理", &options))
        });
    }

    group.finish();
}

fn bench_options_creation(c: &mut Criterion) {
    c.bench_function("options_creation", |b| {
        b.iter(|| black_box(ProcessOptions::new().with_caption_window(5)))
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_chunking,
    bench_options_creation,
);
criterion_main!(benches);
