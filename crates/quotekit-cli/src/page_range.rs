/// Parse a user page selection such as `"1,3-5"` or `"2-"` into sorted,
/// deduplicated zero-based page indices.
///
/// Pages are one-based on the command line. An open-ended range (`"4-"`)
/// runs to the last page.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (first, last) = match part.split_once('-') {
            Some((start, "")) => (page_number(start, page_count)?, page_count),
            Some((start, end)) => (page_number(start, page_count)?, page_number(end, page_count)?),
            None => {
                let page = page_number(part, page_count)?;
                (page, page)
            }
        };
        if first > last {
            return Err(format!("page range '{part}' runs backwards"));
        }
        pages.extend(first - 1..last);
    }

    if pages.is_empty() {
        return Err(format!("no pages selected by '{input}'"));
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn page_number(raw: &str, page_count: usize) -> Result<usize, String> {
    let raw = raw.trim();
    let page: usize = raw
        .parse()
        .map_err(|_| format!("invalid page number: '{raw}'"))?;
    match page {
        0 => Err("page 0 is invalid (pages start at 1)".to_string()),
        p if p > page_count => Err(format!(
            "page {p} exceeds document page count ({page_count})"
        )),
        p => Ok(p),
    }
}
