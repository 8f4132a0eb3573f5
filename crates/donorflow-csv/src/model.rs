use serde::Serialize;

/// A data row after cell trimming. `fields` is aligned with
/// [`ParsedCsv::headers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvRow {
    /// Physical line of the record in the upload (1-based).
    pub line: u64,
    pub fields: Vec<String>,
}

impl CsvRow {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCsv {
    /// Normalized column names in file order.
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

impl ParsedCsv {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a cell by column name.
    pub fn value<'a>(&self, row: &'a CsvRow, column: &str) -> Option<&'a str> {
        self.column_index(column).and_then(|idx| row.get(idx))
    }
}

/// Lowercases, trims and collapses internal whitespace runs into a single
/// underscore, so `" Full  Name "` becomes `full_name`.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
