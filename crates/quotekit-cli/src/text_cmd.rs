use std::path::Path;

use quotekit::{ExtractMode, ExtractionEngine};

use crate::cli::TextFormat;
use crate::shared::{ProgressReporter, open_document, report_warnings, resolve_pages, to_json};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    mode: ExtractMode,
    format: &TextFormat,
) -> Result<(), i32> {
    let engine = ExtractionEngine::default();
    let (doc, _) = open_document(&engine, file)?;
    let page_indices = resolve_pages(pages, doc.page_count())?;
    let progress = ProgressReporter::new(page_indices.len());

    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);
        let result = doc.page_fragments(idx, mode);
        report_warnings(&result.warnings);

        match format {
            TextFormat::Text => {
                println!("--- Page {} ---", idx + 1);
                for fragment in &result.value {
                    match fragment.position {
                        Some(p) => println!("{:.2}\t{:.2}\t{}", p.x, p.y, fragment.text),
                        None => println!("{}", fragment.text),
                    }
                }
            }
            TextFormat::Json => {
                let obj = serde_json::json!({
                    "page": idx + 1,
                    "format": doc.format().as_str(),
                    "fragments": result.value,
                });
                println!("{}", to_json(&obj)?);
            }
        }
    }

    progress.finish();
    Ok(())
}
