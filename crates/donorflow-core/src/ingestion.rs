// crates/donorflow-core/src/ingestion.rs

//! Batch orchestration: one CSV upload in, one [`BatchReport`] out.

use blake3::Hasher;
use chrono::{DateTime, Utc};
use donorflow_csv::{parse_csv, ParsedCsv};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::store::DonorStore;
use crate::types::DonorSource;
use crate::upsert::UpsertKind;
use crate::validation::{validate_row, ColumnLayout};

/// Number of row errors kept in a report; `total_errors` carries the real count.
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_records: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<RowError>,
    pub total_errors: usize,
    pub created: usize,
    pub merged: usize,
}

impl BatchReport {
    /// Fraction of rows written, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_records as f64 * 100.0
    }

    fn record_failure(&mut self, row: usize, error: String) {
        self.failure_count += 1;
        self.total_errors += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(RowError { row, error });
        }
    }
}

pub fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

/// Parses `content` and feeds every row through [`ingest_rows`].
pub async fn ingest_csv<S>(
    store: &S,
    content: &str,
    now: DateTime<Utc>,
) -> Result<BatchReport, IngestError>
where
    S: DonorStore + ?Sized,
{
    let hash = compute_hash(content.as_bytes());
    let parsed = parse_csv(content)?;
    info!(
        hash = %hash,
        rows = parsed.len(),
        columns = parsed.headers.len(),
        "starting donor batch"
    );
    ingest_rows(store, &parsed, now).await
}

/// Processes rows in order. Row failures are recorded in the report; only an
/// empty file or missing columns abort the batch, and they do so before any
/// write.
pub async fn ingest_rows<S>(
    store: &S,
    parsed: &ParsedCsv,
    now: DateTime<Utc>,
) -> Result<BatchReport, IngestError>
where
    S: DonorStore + ?Sized,
{
    if parsed.is_empty() {
        return Err(IngestError::NoData);
    }

    let layout = match ColumnLayout::resolve(parsed) {
        Ok(layout) => layout,
        Err(err) => {
            warn!(missing = ?err.missing, found = ?err.found, "donor batch rejected");
            return Err(err.into());
        }
    };

    let mut report = BatchReport {
        total_records: parsed.len(),
        ..BatchReport::default()
    };

    for (index, row) in parsed.rows.iter().enumerate() {
        let row_num = index + 1;

        let intent = match validate_row(&layout.bind(row), row_num) {
            Ok(intent) => intent,
            Err(err) => {
                debug!(row = row_num, line = row.line, error = %err, "row failed validation");
                report.record_failure(row_num, err.to_string());
                continue;
            }
        };

        match store
            .upsert_donation(&intent, DonorSource::CsvUpload, now)
            .await
        {
            Ok(upserted) => {
                report.success_count += 1;
                match upserted.kind {
                    UpsertKind::Created => report.created += 1,
                    UpsertKind::Merged => report.merged += 1,
                }
            }
            Err(err) => {
                debug!(row = row_num, email = %intent.email, error = %err, "row failed to persist");
                report.record_failure(row_num, format!("Row {row_num}: {err}"));
            }
        }
    }

    info!(
        total = report.total_records,
        succeeded = report.success_count,
        failed = report.failure_count,
        created = report.created,
        merged = report.merged,
        "donor batch finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_beyond_the_cap_are_counted_not_listed() {
        let mut report = BatchReport::default();
        for row in 1..=15 {
            report.record_failure(row, format!("Row {row}: Missing email"));
        }
        assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(report.total_errors, 15);
        assert_eq!(report.failure_count, 15);
        assert_eq!(report.errors.last().map(|e| e.row), Some(10));
    }

    #[test]
    fn success_rate_handles_empty_report() {
        assert_eq!(BatchReport::default().success_rate(), 0.0);
        let report = BatchReport {
            total_records: 4,
            success_count: 3,
            failure_count: 1,
            ..BatchReport::default()
        };
        assert_eq!(report.success_rate(), 75.0);
    }

    #[test]
    fn hash_is_stable_hex() {
        let hash = compute_hash(b"full_name,email\n");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_hash(b"full_name,email\n"));
    }
}
