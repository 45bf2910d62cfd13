use quotekit::{PriceSet, PriceSummary};

use crate::cli::{SourceArgs, TextFormat};
use crate::shared::{detect, load, parse_percentage, to_json};

pub fn run(source: &SourceArgs, percentage: Option<&str>, format: &TextFormat) -> Result<(), i32> {
    let percentage = percentage.map(parse_percentage).transpose()?;
    let loaded = load(source)?;
    let mut set = PriceSet::new(detect(source, &loaded)?);
    if let Some(percentage) = percentage {
        set = set.apply_percentage(percentage);
    }
    let summary = set.summary();

    match format {
        TextFormat::Text => write_text(&summary),
        TextFormat::Json => println!("{}", to_json(&summary)?),
    }
    Ok(())
}

fn write_text(summary: &PriceSummary) {
    println!("prices:\t{}", summary.count);
    println!("modified:\t{}", summary.modified_count);
    println!("total before:\t{:.2}", summary.total_before);
    println!("total after:\t{:.2}", summary.total_after);
    println!("change:\t{:+.2}%", summary.percentage_change);
    for (category, count) in &summary.by_category {
        println!("{category}:\t{count}");
    }
}
