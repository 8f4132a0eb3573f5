// crates/donorflow-core/src/upload.rs

//! Checks an uploaded file before parsing and shapes the JSON bodies the
//! upload endpoint returns.

use serde::Serialize;
use thiserror::Error;

use crate::error::IngestError;
use crate::ingestion::{BatchReport, RowError};
use crate::validation::REQUIRED_COLUMNS;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const CSV_CONTENT_TYPES: [&str; 3] = ["text/csv", "application/csv", "application/vnd.ms-excel"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("No file uploaded")]
    NoFile,

    #[error("Please upload a valid CSV file")]
    InvalidType,

    #[error("File size exceeds {} limit", format_limit(.limit))]
    TooLarge { limit: usize },

    #[error("The CSV file must be UTF-8 encoded")]
    NotUtf8,

    #[error("The CSV file is empty")]
    Empty,
}

/// Whole units print bare (`10MB`), anything else with one decimal.
fn format_limit(limit: &usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;

    let (unit, size) = match *limit {
        bytes if bytes >= MIB => ("MB", MIB),
        bytes if bytes >= KIB => ("KB", KIB),
        bytes => return format!("{bytes} bytes"),
    };
    if limit % size == 0 {
        format!("{}{unit}", limit / size)
    } else {
        format!("{:.1}{unit}", *limit as f64 / size as f64)
    }
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

fn is_csv(filename: Option<&str>, content_type: Option<&str>) -> bool {
    let by_type = content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            CSV_CONTENT_TYPES.contains(&mime.as_str())
        })
        .unwrap_or(false);
    let by_name = filename
        .map(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .unwrap_or(false);
    by_type || by_name
}

/// Returns the decoded text of an acceptable upload.
pub fn check_upload(file: Option<&UploadFile>, limit: usize) -> Result<&str, UploadRejection> {
    let file = file.ok_or(UploadRejection::NoFile)?;

    if !is_csv(file.filename.as_deref(), file.content_type.as_deref()) {
        return Err(UploadRejection::InvalidType);
    }
    if file.bytes.len() > limit {
        return Err(UploadRejection::TooLarge { limit });
    }

    let text = std::str::from_utf8(&file.bytes).map_err(|_| UploadRejection::NotUtf8)?;
    if text.trim_start_matches('\u{feff}').trim().is_empty() {
        return Err(UploadRejection::Empty);
    }
    Ok(text)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(rename = "successRate")]
    pub success_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub total_records: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<RowError>,
    pub total_errors: usize,
    pub summary: UploadSummary,
}

impl From<BatchReport> for UploadResponse {
    fn from(report: BatchReport) -> Self {
        let summary = UploadSummary {
            processed: report.total_records,
            successful: report.success_count,
            failed: report.failure_count,
            success_rate: format!("{:.1}%", report.success_rate()),
        };
        UploadResponse {
            message: "Donor data uploaded successfully".to_string(),
            total_records: report.total_records,
            success_count: report.success_count,
            failure_count: report.failure_count,
            errors: report.errors,
            total_errors: report.total_errors,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFailureResponse {
    pub message: String,
    pub required_columns: Vec<String>,
    pub found_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseFailureResponse {
    pub message: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Client-error body for a batch that was rejected before row processing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RejectionBody {
    Schema(SchemaFailureResponse),
    Parse(ParseFailureResponse),
    Message(MessageResponse),
}

impl From<&IngestError> for RejectionBody {
    fn from(err: &IngestError) -> Self {
        match err {
            IngestError::Schema(schema) => RejectionBody::Schema(SchemaFailureResponse {
                message: schema.to_string(),
                required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found_columns: schema.found.clone(),
            }),
            IngestError::Parse(parse) => RejectionBody::Parse(ParseFailureResponse {
                message: "CSV parsing failed".to_string(),
                errors: parse.messages(),
            }),
            IngestError::NoData => RejectionBody::Message(MessageResponse {
                message: err.to_string(),
            }),
        }
    }
}

impl From<&UploadRejection> for RejectionBody {
    fn from(rejection: &UploadRejection) -> Self {
        RejectionBody::Message(MessageResponse {
            message: rejection.to_string(),
        })
    }
}
