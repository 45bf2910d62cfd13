use quotekit::DetectedPrice;

use crate::cli::{OutputFormat, SourceArgs};
use crate::shared::{csv_escape, detect, load, to_json};

pub fn run(source: &SourceArgs, format: &OutputFormat) -> Result<(), i32> {
    let loaded = load(source)?;
    let prices = detect(source, &loaded)?;

    match format {
        OutputFormat::Text => write_text(&prices),
        OutputFormat::Json => println!("{}", to_json(&prices)?),
        OutputFormat::Csv => write_csv(&prices),
    }
    Ok(())
}

fn write_text(prices: &[DetectedPrice]) {
    println!("id\tpage\tvalue\tcategory\tconfidence\tx\ty\tcontext");
    for p in prices {
        println!(
            "{}\t{}\t{:.2}\t{}\t{:.2}\t{:.2}\t{:.2}\t{}",
            p.id,
            p.page_index + 1,
            p.value(),
            p.category,
            p.confidence,
            p.position.x,
            p.position.y,
            p.context,
        );
    }
}

fn write_csv(prices: &[DetectedPrice]) {
    println!("id,page,value,category,confidence,x,y,synthesized,context");
    for p in prices {
        println!(
            "{},{},{:.2},{},{:.2},{:.2},{:.2},{},{}",
            p.id,
            p.page_index + 1,
            p.value(),
            p.category,
            p.confidence,
            p.position.x,
            p.position.y,
            p.position_synthesized,
            csv_escape(&p.context),
        );
    }
}
