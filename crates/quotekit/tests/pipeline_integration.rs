//! End-to-end tests: document bytes → engine → adjuster → overlay plan → PDF.
//!
//! Test PDFs are created programmatically using lopdf.

use quotekit::{
    Document, DocumentFormat, EngineOptions, ExtractMode, ExtractWarningCode, ExtractionEngine,
    OverlayOptions, Percentage, PriceCategory, PriceSet, QuoteError, plan_overlays,
};

// --- Test PDF creation helpers ---

/// Create a PDF with one page per content stream, sharing a Helvetica `/F1`.
fn pdf_with_pages(pages: &[&[u8]]) -> Vec<u8> {
    use lopdf::{Object, Stream, dictionary};

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for content in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
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
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

const QUOTATION_PAGE: &[u8] = b"BT /F1 10 Tf 72 700 Td (Chair) Tj 200 0 Td (\x80 45,00) Tj ET \
BT /F1 10 Tf 72 680 Td (Desk) Tj 200 0 Td (120,50 \x80) Tj ET \
BT /F1 10 Tf 72 640 Td (Total: 165,50 \x80) Tj ET";

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn positioned_pdf_pipeline() {
    let pdf = pdf_with_pages(&[QUOTATION_PAGE]);
    let engine = ExtractionEngine::init(EngineOptions::default());
    let token = engine.begin_load();
    let doc = engine.open(&pdf, Some("offer.pdf")).unwrap();
    assert_eq!(doc.format(), DocumentFormat::Pdf);

    let result = engine
        .detect_document(&doc, &token, ExtractMode::Positioned)
        .unwrap();
    assert!(result.is_clean());
    let prices = result.value;
    let values: Vec<f64> = prices.iter().map(|p| p.value()).collect();
    assert_eq!(values, [45.0, 120.5, 165.5]);
    assert!(prices.iter().all(|p| !p.position_synthesized));
    assert_eq!(prices[0].position.x, 272.0);
    assert_eq!(prices[0].position.y, 700.0);
    assert_eq!(prices[0].category, PriceCategory::Product);
    assert_eq!(prices[2].category, PriceCategory::Total);
    // "Total: " is seven 5pt characters ahead of the amount
    assert_eq!(prices[2].matched_text, "165,50 €");
    assert!(approx(prices[2].position.x, 107.0));

    let ids: Vec<&str> = prices.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p0-0", "p0-1", "p0-2"]);
    engine.dispose();
}

#[test]
fn adjust_and_summarize_detected_prices() {
    let pdf = pdf_with_pages(&[QUOTATION_PAGE]);
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    let prices = engine
        .detect_document(&doc, &token, ExtractMode::Positioned)
        .unwrap()
        .value;

    let set = PriceSet::new(prices).apply_percentage("+10".parse::<Percentage>().unwrap());
    let summary = set.summary();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.modified_count, 3);
    assert!(approx(summary.total_before, 331.0));
    assert!(approx(summary.total_after, 364.1));
    assert!(approx(summary.percentage_change, 10.0));

    let edited = set.update_single("p0-0", 50.0).unwrap();
    assert_eq!(edited.get("p0-0").unwrap().value(), 50.0);
    assert_eq!(edited.get("p0-0").unwrap().original_value(), 45.0);

    let back = edited.reset();
    assert!(back.prices().iter().all(|p| !p.is_modified()));
}

#[cfg(feature = "write")]
#[test]
fn bake_writes_new_prices() {
    use quotekit::bake_overlays;
    use quotekit::quotekit_parse::PdfSource;

    let pdf = pdf_with_pages(&[QUOTATION_PAGE]);
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    let prices = engine
        .detect_document(&doc, &token, ExtractMode::Positioned)
        .unwrap()
        .value;
    let adjusted = quotekit::apply_percentage_to_all(&prices, Percentage::new(10.0).unwrap());
    let plan = plan_overlays(&adjusted, &OverlayOptions::default());
    assert_eq!(plan.len(), 3);

    let baked = bake_overlays(&pdf, &plan).unwrap();
    let source = PdfSource::open(&baked).unwrap();
    let texts: Vec<String> = source
        .page_runs(0)
        .unwrap()
        .into_iter()
        .map(|r| r.text)
        .collect();
    assert!(texts.contains(&"€49.50".to_string()), "{texts:?}");
    assert!(texts.contains(&"€132.55".to_string()), "{texts:?}");
    assert!(texts.contains(&"€182.05".to_string()), "{texts:?}");
    // The original text is covered, not removed.
    assert!(texts.contains(&"Chair".to_string()));
}

#[cfg(feature = "write")]
#[test]
fn bake_without_modifications_is_identity() {
    let pdf = pdf_with_pages(&[QUOTATION_PAGE]);
    let baked = quotekit::bake_overlays(&pdf, &[]).unwrap();
    assert_eq!(baked, pdf);
}

#[test]
fn corrupt_page_does_not_stop_detection() {
    let pdf = pdf_with_pages(&[
        b"BT /F1 12 Tf 72 700 Td (Total 10,00 \x80) Tj ET",
        b"BT /F1 12 Tf [(broken",
        b"BT /F1 12 Tf 72 700 Td (Total 30,00 \x80) Tj ET",
    ]);
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    let result = engine.detect_document(&doc, &token, ExtractMode::Bulk).unwrap();

    let pages: Vec<usize> = result.value.iter().map(|p| p.page_index).collect();
    assert_eq!(pages, [0, 2]);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].code, ExtractWarningCode::PageExtractionFailed);
    assert_eq!(result.warnings[0].page, Some(1));
}

#[test]
fn bulk_ids_count_per_page() {
    let pdf = pdf_with_pages(&[
        b"BT /F1 12 Tf 72 700 Td (\x80 5,00) Tj 0 -20 Td (\x80 7,00) Tj ET",
        b"BT /F1 12 Tf 72 700 Td (\x80 9,00) Tj ET",
    ]);
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    let prices = engine
        .detect_document(&doc, &token, ExtractMode::Bulk)
        .unwrap()
        .value;

    let mut ids: Vec<(String, f64)> = prices.iter().map(|p| (p.id.clone(), p.value())).collect();
    ids.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        ids,
        [
            ("p0-0".to_string(), 5.0),
            ("p0-1".to_string(), 7.0),
            ("p1-0".to_string(), 9.0)
        ]
    );
    assert!(prices.iter().all(|p| p.position_synthesized));
}

#[test]
fn stale_load_is_superseded() {
    let pdf = pdf_with_pages(&[QUOTATION_PAGE]);
    let engine = ExtractionEngine::default();
    let old = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    let _new = engine.begin_load();

    let err = engine
        .detect_document(&doc, &old, ExtractMode::Positioned)
        .unwrap_err();
    assert!(matches!(err, QuoteError::Superseded { generation: 1, current: 2 }));
}

#[test]
fn load_started_mid_document_supersedes_detection() {
    use std::sync::Mutex;

    let pdf = pdf_with_pages(&[QUOTATION_PAGE, QUOTATION_PAGE, QUOTATION_PAGE]);
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    assert_eq!(doc.page_count(), 3);

    let newer = Mutex::new(None);
    let err = engine
        .detect_pages_with_progress(&doc, &token, ExtractMode::Positioned, &[0, 1, 2], &|page| {
            let mut newer = newer.lock().unwrap();
            if page == 0 && newer.is_none() {
                *newer = Some(engine.begin_load());
            }
        })
        .unwrap_err();
    assert!(matches!(err, QuoteError::Superseded { generation: 1, current: 2 }));

    let current = newer.into_inner().unwrap().unwrap();
    let result = engine
        .detect_document(&doc, &current, ExtractMode::Positioned)
        .unwrap();
    assert_eq!(result.value.len(), 9);
}

#[test]
fn rtf_quotation_in_greek_code_page() {
    let rtf = b"{\\rtf1\\ansi\\ansicpg1253{\\fonttbl{\\f0 Arial;}}\\f0 \
                \\'d4\\'e9\\'ec\\'de: 45,00\\par \
                \\'d3\\'fd\\'ed\\'ef\\'eb\\'ef: 90,00\\par}";
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(rtf, Some("offer.rtf")).unwrap();
    assert_eq!(doc.format(), DocumentFormat::Rtf);

    let prices = engine
        .detect_document(&doc, &token, ExtractMode::Bulk)
        .unwrap()
        .value;
    let values: Vec<f64> = prices.iter().map(|p| p.value()).collect();
    assert_eq!(values, [45.0, 90.0]);
    let total = prices.iter().find(|p| p.value() == 90.0).unwrap();
    assert_eq!(total.category, PriceCategory::Total);
}

#[test]
fn utf8_rtf_with_greek_code_page_header() {
    let rtf = "{\\rtf1\\ansi\\ansicpg1253{\\fonttbl{\\f0 Arial;}}\\f0 Σύνολο: 55,80\\par}";
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(rtf.as_bytes(), Some("offer.rtf")).unwrap();

    let result = engine.detect_document(&doc, &token, ExtractMode::Bulk).unwrap();
    assert!(result.is_clean());
    assert_eq!(result.value.len(), 1);
    assert_eq!(result.value[0].value(), 55.8);
    assert_eq!(result.value[0].category, PriceCategory::Total);
    assert_eq!(result.value[0].confidence, 0.92);
}

#[test]
fn rtf_behind_utf8_bom() {
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(b"{\\rtf1\\ansi{\\fonttbl{\\f0 Arial;}}\\f0 Total 10,00 EUR\\par}");
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&bytes, None).unwrap();
    assert_eq!(doc.format(), DocumentFormat::Rtf);

    let prices = engine
        .detect_document(&doc, &token, ExtractMode::Bulk)
        .unwrap()
        .value;
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].value(), 10.0);
    assert_eq!(prices[0].category, PriceCategory::Total);
}

#[test]
fn csv_price_list() {
    let csv = "Είδος;Τιμή\nΚαρέκλα;45,00 €\nΓραφείο;120,50 €\n";
    let doc = Document::open(csv.as_bytes(), Some("prices.csv")).unwrap();
    assert_eq!(doc.format(), DocumentFormat::Csv);

    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let prices = engine
        .detect_document(&doc, &token, ExtractMode::Bulk)
        .unwrap()
        .value;
    let values: Vec<f64> = prices.iter().map(|p| p.value()).collect();
    assert_eq!(values, [45.0, 120.5]);
}

#[test]
fn document_without_prices_is_not_an_error() {
    let pdf = pdf_with_pages(&[b"BT /F1 12 Tf 72 700 Td (Thank you for your order) Tj ET"]);
    let engine = ExtractionEngine::default();
    let token = engine.begin_load();
    let doc = engine.open(&pdf, None).unwrap();
    let result = engine
        .detect_document(&doc, &token, ExtractMode::Positioned)
        .unwrap();
    assert!(result.value.is_empty());
    assert!(result.is_clean());
}
