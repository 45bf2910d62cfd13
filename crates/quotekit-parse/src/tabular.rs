//! Tabular sources: CSV files and (with the `spreadsheet` feature) XLSX
//! workbooks.
//!
//! Each non-empty row becomes one line of text with its cells separated by a
//! single space, so a price column ends up next to its description the way
//! it reads on a printed quotation.

use crate::encoding::decode_best;
use crate::error::BackendError;

const DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

/// Lines inspected when guessing the delimiter.
const SNIFF_LINES: usize = 5;

/// Guess the field delimiter among `;`, `,` and tab.
///
/// The delimiter that appears on every sampled line the most times wins;
/// `;` wins ties since `,` doubles as the decimal separator in European
/// price lists. Single-column files default to `,`.
pub fn sniff_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = (b',', 0usize, 0usize);
    for delimiter in DELIMITERS {
        let counts = lines
            .iter()
            .map(|l| l.bytes().filter(|b| *b == delimiter).count());
        let min = counts.clone().min().unwrap_or(0);
        let total: usize = counts.sum();
        if (min, total) > (best.1, best.2) {
            best = (delimiter, min, total);
        }
    }
    best.0
}

/// Read CSV bytes (any supported encoding) into line-per-row text.
pub fn csv_to_text(bytes: &[u8]) -> Result<String, BackendError> {
    let decoded = decode_best(bytes);
    let delimiter = sniff_delimiter(&decoded.text);
    tracing::debug!(delimiter = %char::from(delimiter), "reading CSV");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(decoded.text.as_bytes());

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<&str> = record
            .iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if !cells.is_empty() {
            lines.push(cells.join(" "));
        }
    }
    Ok(lines.join("\n"))
}

/// Read every worksheet of an XLSX workbook into line-per-row text.
///
/// Numbers are rendered with two decimals so they read as prices.
#[cfg(feature = "spreadsheet")]
pub fn xlsx_to_text(bytes: &[u8]) -> Result<String, BackendError> {
    use calamine::{Reader, Xlsx};
    use std::io::Cursor;

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| BackendError::Spreadsheet(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    if sheet_names.is_empty() {
        return Err(BackendError::Spreadsheet("workbook has no sheets".to_string()));
    }

    let mut lines = Vec::new();
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| BackendError::Spreadsheet(format!("{name}: {e}")))?;
        for row in range.rows() {
            let cells: Vec<String> = row.iter().filter_map(cell_text).collect();
            if !cells.is_empty() {
                lines.push(cells.join(" "));
            }
        }
    }
    Ok(lines.join("\n"))
}

#[cfg(feature = "spreadsheet")]
fn cell_text(cell: &calamine::Data) -> Option<String> {
    use calamine::Data;

    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format!("{f:.2}"),
        Data::Int(i) => format!("{i}.00"),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    };
    (!text.is_empty()).then_some(text)
}
