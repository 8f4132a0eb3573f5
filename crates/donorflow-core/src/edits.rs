// crates/donorflow-core/src/edits.rs

//! Administrative replace and partial update of an existing donor.

use chrono::{DateTime, Utc};

use crate::constraints;
use crate::error::PersistenceError;
use crate::types::{DonationEntry, Donor, DonorPatch, NewDonor};

/// Full overwrite. The history restarts from the supplied donation so the
/// aggregates match it. Email is the identity key and cannot change here.
pub fn replace_donor(
    existing: &Donor,
    input: NewDonor,
    now: DateTime<Utc>,
) -> Result<Donor, PersistenceError> {
    let is_active = input.is_active.unwrap_or(true);
    let source = input.source.unwrap_or(existing.source);
    let intent = input.into_intent();

    if intent.email != existing.email {
        return Err(PersistenceError::constraint(
            "Email cannot be changed; delete and recreate the donor instead",
        ));
    }

    let payment_method = constraints::check_intent(&intent, now.date_naive())?;

    Ok(Donor {
        id: existing.id,
        full_name: intent.full_name,
        email: intent.email,
        phone: intent.phone,
        address: intent.address,
        donation_amount: intent.donation_amount,
        donation_date: intent.donation_date,
        payment_method,
        notes: intent.notes.clone(),
        total_donated: intent.donation_amount,
        donation_history: vec![DonationEntry {
            amount: intent.donation_amount,
            date: intent.donation_date,
            payment_method,
            notes: intent.notes,
        }],
        last_donated: intent.donation_date,
        is_active,
        source,
        created_at: existing.created_at,
        updated_at: now,
    })
}

pub fn apply_patch(
    mut donor: Donor,
    patch: DonorPatch,
    now: DateTime<Utc>,
) -> Result<Donor, PersistenceError> {
    if let Some(full_name) = patch.full_name {
        donor.full_name = full_name.trim().to_string();
    }
    if let Some(phone) = patch.phone {
        donor.phone = phone.trim().to_string();
    }
    if let Some(address) = patch.address {
        donor.address = address.trim().to_string();
    }
    if let Some(notes) = patch.notes {
        donor.notes = notes.trim().to_string();
    }
    if let Some(is_active) = patch.is_active {
        donor.is_active = is_active;
    }

    // Existing donation dates are not re-judged against the clock.
    let today = now.date_naive().max(donor.donation_date);
    constraints::check_donor(&donor, today)?;
    donor.updated_at = now;
    Ok(donor)
}
