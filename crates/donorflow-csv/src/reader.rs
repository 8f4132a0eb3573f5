use csv::{ReaderBuilder, StringRecord};

use crate::errors::{ParseError, ParseProblem};
use crate::model::{normalize_header, CsvRow, ParsedCsv};

/// Splits decoded upload text into normalized rows.
///
/// The first non-empty line is the header. Empty lines never produce a row.
/// Records whose field count differs from the header are collected as
/// problems and reported together.
pub fn parse_csv(content: &str) -> Result<ParsedCsv, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut problems = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|source| ParseError::Csv { source })?;

        if is_blank(&record) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let Some(header) = headers.as_ref() else {
            headers = Some(record.iter().map(normalize_header).collect());
            continue;
        };

        if record.len() != header.len() {
            let kind = if record.len() < header.len() {
                "Too few fields"
            } else {
                "Too many fields"
            };
            problems.push(ParseProblem::new(
                line,
                format!(
                    "{kind}: expected {} fields but parsed {}",
                    header.len(),
                    record.len()
                ),
            ));
            continue;
        }

        rows.push(CsvRow {
            line,
            fields: record.iter().map(|value| value.trim().to_string()).collect(),
        });
    }

    let headers = headers.ok_or(ParseError::MissingHeader)?;

    if !problems.is_empty() {
        return Err(ParseError::Malformed { problems });
    }

    Ok(ParsedCsv { headers, rows })
}

// The csv reader already drops zero-length lines; a whitespace-only line
// still arrives as a single empty-looking field.
fn is_blank(record: &StringRecord) -> bool {
    record.is_empty() || (record.len() == 1 && record[0].trim().is_empty())
}
