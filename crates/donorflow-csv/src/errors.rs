use std::fmt;

use thiserror::Error;

/// One structural problem found while splitting the upload into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProblem {
    pub line: u64,
    pub message: String,
}

impl ParseProblem {
    pub fn new(line: u64, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV input did not contain a header row")]
    MissingHeader,

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("CSV structure invalid ({} problem(s)); first: {}", problems.len(), first_problem(problems))]
    Malformed { problems: Vec<ParseProblem> },
}

impl ParseError {
    /// Flattened human-readable messages, one per underlying problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ParseError::Malformed { problems } => {
                problems.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

fn first_problem(problems: &[ParseProblem]) -> String {
    problems
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}
