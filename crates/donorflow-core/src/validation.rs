// crates/donorflow-core/src/validation.rs

use chrono::{DateTime, NaiveDate};
use donorflow_csv::{CsvRow, ParsedCsv};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RowValidationError, SchemaError};
use crate::types::DonationIntent;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "full_name",
    "email",
    "phone",
    "address",
    "donation_amount",
    "donation_date",
    "payment_method",
];

pub const NOTES_COLUMN: &str = "notes";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub(crate) fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Column positions resolved once per upload. Obtaining one proves every
/// required column is present, so rows can be bound without lookups failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    full_name: usize,
    email: usize,
    phone: usize,
    address: usize,
    donation_amount: usize,
    donation_date: usize,
    payment_method: usize,
    notes: Option<usize>,
}

impl ColumnLayout {
    pub fn resolve(parsed: &ParsedCsv) -> Result<Self, SchemaError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !parsed.has_column(column))
            .map(|column| column.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(SchemaError {
                missing,
                found: parsed.headers.clone(),
            });
        }

        let index = |name: &str| parsed.column_index(name).unwrap_or_default();

        Ok(Self {
            full_name: index("full_name"),
            email: index("email"),
            phone: index("phone"),
            address: index("address"),
            donation_amount: index("donation_amount"),
            donation_date: index("donation_date"),
            payment_method: index("payment_method"),
            notes: parsed.column_index(NOTES_COLUMN),
        })
    }

    pub fn bind<'a>(&self, row: &'a CsvRow) -> DonationRow<'a> {
        let cell = |idx: usize| row.get(idx).unwrap_or("");
        DonationRow {
            full_name: cell(self.full_name),
            email: cell(self.email),
            phone: cell(self.phone),
            address: cell(self.address),
            donation_amount: cell(self.donation_amount),
            donation_date: cell(self.donation_date),
            payment_method: cell(self.payment_method),
            notes: self.notes.map(cell),
        }
    }
}

/// Borrowed, still-unvalidated view of one row's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonationRow<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub address: &'a str,
    pub donation_amount: &'a str,
    pub donation_date: &'a str,
    pub payment_method: &'a str,
    pub notes: Option<&'a str>,
}

/// Runs every per-row check and collects all violations.
///
/// `row_num` is 1-based over data rows. Future dates are accepted here; the
/// donor constraints reject them when the row is written.
pub fn validate_row(
    row: &DonationRow<'_>,
    row_num: usize,
) -> Result<DonationIntent, RowValidationError> {
    let mut messages = Vec::new();
    let mut fail = |description: &str| messages.push(format!("Row {row_num}: {description}"));

    let full_name = row.full_name.trim();
    if full_name.is_empty() {
        fail("Missing full_name");
    }

    let email = row.email.trim();
    if email.is_empty() {
        fail("Missing email");
    } else if !is_valid_email(email) {
        fail("Invalid email");
    }

    let phone = row.phone.trim();
    if phone.is_empty() {
        fail("Missing phone");
    }

    let address = row.address.trim();
    if address.is_empty() {
        fail("Missing address");
    }

    let amount = parse_amount(row.donation_amount);
    if amount.is_none() {
        fail("Invalid donation_amount");
    }

    let date = parse_date(row.donation_date);
    if date.is_none() {
        fail("Invalid donation_date");
    }

    let payment_method = row.payment_method.trim();
    if payment_method.is_empty() {
        fail("Missing payment_method");
    }

    match (amount, date) {
        (Some(donation_amount), Some(donation_date)) if messages.is_empty() => Ok(DonationIntent {
            full_name: full_name.to_string(),
            email: email.to_lowercase(),
            phone: phone.to_string(),
            address: address.to_string(),
            donation_amount,
            donation_date,
            payment_method: payment_method.to_string(),
            notes: row.notes.map(str::trim).unwrap_or_default().to_string(),
        }),
        _ => Err(RowValidationError {
            row: row_num,
            messages,
        }),
    }
}

/// Positive, finite decimal. Rejects `NaN`, `inf` and anything non-numeric.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, or an RFC 3339 timestamp (date part).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
