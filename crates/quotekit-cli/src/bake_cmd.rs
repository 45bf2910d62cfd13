use std::path::Path;

use quotekit::{DocumentFormat, OverlayOptions, PriceSet, bake_overlays, plan_overlays};

use crate::cli::SourceArgs;
use crate::shared::{EXIT_FAILURE, EXIT_INVALID_INPUT, detect, load, parse_percentage};

pub fn run(
    source: &SourceArgs,
    percentage: &str,
    output: &Path,
    symbol: &str,
    font_size: f64,
) -> Result<(), i32> {
    let percentage = parse_percentage(percentage)?;
    if !(font_size.is_finite() && font_size > 0.0) {
        eprintln!("Error: --font-size must be a positive number");
        return Err(EXIT_INVALID_INPUT);
    }

    let loaded = load(source)?;
    if loaded.document.format() != DocumentFormat::Pdf {
        eprintln!(
            "Error: bake needs a PDF input, got {}",
            loaded.document.format()
        );
        return Err(EXIT_FAILURE);
    }

    let set = PriceSet::new(detect(source, &loaded)?).apply_percentage(percentage);
    let options = OverlayOptions {
        currency_symbol: symbol.to_string(),
        font_size,
        ..OverlayOptions::default()
    };
    let plan = plan_overlays(set.prices(), &options);

    let skipped = set
        .modified()
        .filter(|p| p.position_synthesized)
        .count();
    if skipped > 0 {
        eprintln!(
            "Warning: {skipped} price(s) have no page position and were not baked (use --mode positioned)"
        );
    }

    let baked = bake_overlays(&loaded.bytes, &plan).map_err(|e| {
        eprintln!("Error: failed to write prices: {e}");
        EXIT_FAILURE
    })?;
    std::fs::write(output, baked).map_err(|e| {
        eprintln!("Error: failed to write {}: {e}", output.display());
        EXIT_FAILURE
    })?;

    println!("baked {} price(s) into {}", plan.len(), output.display());
    Ok(())
}
