pub mod errors;
pub mod model;
mod reader;

pub use errors::{ParseError, ParseProblem};
pub use model::{normalize_header, CsvRow, ParsedCsv};
pub use reader::parse_csv;

#[cfg(test)]
mod tests;
