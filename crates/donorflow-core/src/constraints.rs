// crates/donorflow-core/src/constraints.rs

//! Write-time rules for donor records. Stricter than row validation: every
//! write path (CSV upsert, manual entry, replace, patch) goes through here.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PersistenceError;
use crate::types::{DonationIntent, Donor, PaymentMethod};
use crate::validation::is_valid_email;

pub const MIN_DONATION_AMOUNT: f64 = 0.01;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern compiles"));

/// Checks an incoming donation against the donor rules and resolves its
/// payment method. `today` is the ingestion date in UTC.
pub fn check_intent(
    intent: &DonationIntent,
    today: NaiveDate,
) -> Result<PaymentMethod, PersistenceError> {
    let mut violations = Vec::new();
    check_contact(
        &intent.full_name,
        &intent.email,
        &intent.phone,
        &intent.address,
        &mut violations,
    );
    check_donation(
        intent.donation_amount,
        intent.donation_date,
        today,
        &mut violations,
    );
    check_notes(&intent.notes, &mut violations);

    let method = PaymentMethod::parse(&intent.payment_method);
    if method.is_none() {
        violations.push("Please select a valid payment method".to_string());
    }

    match method {
        Some(method) if violations.is_empty() => Ok(method),
        _ => Err(PersistenceError::Constraint(violations)),
    }
}

/// Re-checks a fully built donor, used after replace and patch.
pub fn check_donor(donor: &Donor, today: NaiveDate) -> Result<(), PersistenceError> {
    let mut violations = Vec::new();
    check_contact(
        &donor.full_name,
        &donor.email,
        &donor.phone,
        &donor.address,
        &mut violations,
    );
    check_donation(
        donor.donation_amount,
        donor.donation_date,
        today,
        &mut violations,
    );
    check_notes(&donor.notes, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(PersistenceError::Constraint(violations))
    }
}

fn check_contact(
    full_name: &str,
    email: &str,
    phone: &str,
    address: &str,
    violations: &mut Vec<String>,
) {
    let name_len = full_name.trim().chars().count();
    if name_len < 2 {
        violations.push("Full name must be at least 2 characters long".to_string());
    } else if name_len > 100 {
        violations.push("Full name cannot exceed 100 characters".to_string());
    }

    if !is_valid_email(email.trim()) {
        violations.push("Please provide a valid email address".to_string());
    }

    if !PHONE_PATTERN.is_match(phone.trim()) {
        violations.push("Please enter a valid phone number".to_string());
    }

    let address_len = address.trim().chars().count();
    if address_len < 10 {
        violations.push("Address must be at least 10 characters long".to_string());
    } else if address_len > 500 {
        violations.push("Address cannot exceed 500 characters".to_string());
    }
}

fn check_donation(amount: f64, date: NaiveDate, today: NaiveDate, violations: &mut Vec<String>) {
    if !amount.is_finite() {
        violations.push("Please provide a valid donation amount".to_string());
    } else if amount < MIN_DONATION_AMOUNT {
        violations.push("Donation amount must be greater than 0".to_string());
    }

    if date > today {
        violations.push("Donation date cannot be in the future".to_string());
    }
}

fn check_notes(notes: &str, violations: &mut Vec<String>) {
    if notes.chars().count() > 1000 {
        violations.push("Notes cannot exceed 1000 characters".to_string());
    }
}
