//! Performance benchmarks for quotekit.
//!
//! Cover the detection pipeline on bulk text, on positioned fragments, and
//! end to end from PDF bytes, plus percentage adjustment of a large list.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lopdf::{Object, Stream, dictionary};
use quotekit::{
    EngineOptions, ExtractMode, ExtractionEngine, Percentage, PriceDetector, TextFragment,
    apply_percentage_to_all,
};

// ---------------------------------------------------------------------------
// Fixture generators
// ---------------------------------------------------------------------------

const LINES: &[&str] = &[
    "Καρέκλα γραφείου          2 τεμ.   Τιμή: 45,00 €",
    "Desk, oak veneer          1 pc     Price: 1.250,00 EUR",
    "Date 12/05/2024   Tel 2310555123   Ref 12-34-56",
    "ΦΠΑ 24%: 310,80",
    "Shipping: 25,00",
    "Σύνολο: 1.630,80 €",
];

fn quotation_text(repeat: usize) -> String {
    let mut text = String::new();
    for _ in 0..repeat {
        for line in LINES {
            text.push_str(line);
            text.push('\n');
        }
    }
    text
}

fn quotation_fragments(repeat: usize) -> Vec<TextFragment> {
    let mut fragments = Vec::new();
    for i in 0..repeat {
        for (j, line) in LINES.iter().enumerate() {
            let y = 800.0 - ((i * LINES.len() + j) % 60) as f64 * 12.0;
            fragments.push(TextFragment::positioned(*line, 72.0, y, i / 10));
        }
    }
    fragments
}

/// Build a PDF with `pages` pages, each holding the quotation lines.
fn quotation_pdf(pages: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut content = Vec::new();
    for (i, line) in ["Chair 2 pcs", "Price: 45,00 EUR", "VAT 24%: 10,80", "Total: 55,80 EUR"]
        .iter()
        .enumerate()
    {
        content.extend_from_slice(
            format!("BT /F1 10 Tf 72 {} Td ({line}) Tj ET\n", 700 - i * 14).as_bytes(),
        );
    }

    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save bench PDF");
    buf
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_bulk_text(c: &mut Criterion) {
    let detector = PriceDetector::default();
    let text = quotation_text(50);
    c.bench_function("detect_text/300_lines", |b| {
        b.iter(|| detector.detect_text(black_box(&text), 0))
    });
}

fn bench_fragments(c: &mut Criterion) {
    let detector = PriceDetector::default();
    let fragments = quotation_fragments(50);
    c.bench_function("detect_fragments/300_runs", |b| {
        b.iter(|| detector.detect_fragments(black_box(&fragments)))
    });
}

fn bench_pdf_pipeline(c: &mut Criterion) {
    let pdf = quotation_pdf(20);
    let engine = ExtractionEngine::init(EngineOptions::default());
    c.bench_function("pdf_pipeline/20_pages", |b| {
        b.iter(|| {
            let token = engine.begin_load();
            let doc = engine.open(black_box(&pdf), None).expect("bench PDF opens");
            engine
                .detect_document(&doc, &token, ExtractMode::Positioned)
                .expect("current load")
        })
    });
}

fn bench_adjust(c: &mut Criterion) {
    let detector = PriceDetector::default();
    let prices = detector.detect_text(&quotation_text(200), 0);
    let pct = Percentage::new(7.5).expect("valid percentage");
    c.bench_function("apply_percentage_to_all", |b| {
        b.iter(|| apply_percentage_to_all(black_box(&prices), pct))
    });
}

criterion_group!(
    benches,
    bench_bulk_text,
    bench_fragments,
    bench_pdf_pipeline,
    bench_adjust
);
criterion_main!(benches);
