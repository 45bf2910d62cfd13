use quotekit::{DetectedPrice, PriceSet};

use crate::cli::{OutputFormat, SourceArgs};
use crate::shared::{csv_escape, detect, load, parse_percentage, to_json};

pub fn run(source: &SourceArgs, percentage: &str, format: &OutputFormat) -> Result<(), i32> {
    let percentage = parse_percentage(percentage)?;
    let loaded = load(source)?;
    let set = PriceSet::new(detect(source, &loaded)?).apply_percentage(percentage);
    tracing::debug!(%percentage, modified = set.modified().count(), "applied percentage");

    match format {
        OutputFormat::Text => write_text(set.prices()),
        OutputFormat::Json => println!("{}", to_json(set.prices())?),
        OutputFormat::Csv => write_csv(set.prices()),
    }
    Ok(())
}

fn write_text(prices: &[DetectedPrice]) {
    for p in prices {
        println!(
            "{}\t{:.2} → {:.2}\t{}",
            p.id,
            p.original_value(),
            p.value(),
            p.category
        );
    }
}

fn write_csv(prices: &[DetectedPrice]) {
    println!("id,page,original,value,modified,category,context");
    for p in prices {
        println!(
            "{},{},{:.2},{:.2},{},{},{}",
            p.id,
            p.page_index + 1,
            p.original_value(),
            p.value(),
            p.is_modified(),
            p.category,
            csv_escape(&p.context),
        );
    }
}
