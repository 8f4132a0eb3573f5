// crates/donorflow-core/src/upsert.rs

//! Create-or-merge of a donation into the donor sharing its email.
//!
//! The plan is computed here without I/O; stores load the current donor,
//! call [`plan_upsert`], and persist the result atomically.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constraints;
use crate::error::PersistenceError;
use crate::types::{DonationEntry, DonationIntent, Donor, DonorSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertKind {
    Created,
    Merged,
}

/// What a store must write for one donation.
#[derive(Debug, Clone)]
pub struct UpsertPlan {
    pub kind: UpsertKind,
    /// Donor state after the donation is applied, history included.
    pub donor: Donor,
    /// The history entry this donation appends.
    pub entry: DonationEntry,
}

/// Result returned by stores after the plan is committed.
#[derive(Debug, Clone)]
pub struct Upserted {
    pub kind: UpsertKind,
    pub donor: Donor,
}

impl From<UpsertPlan> for Upserted {
    fn from(plan: UpsertPlan) -> Self {
        Upserted {
            kind: plan.kind,
            donor: plan.donor,
        }
    }
}

pub fn plan_upsert(
    existing: Option<Donor>,
    intent: &DonationIntent,
    source: DonorSource,
    now: DateTime<Utc>,
) -> Result<UpsertPlan, PersistenceError> {
    let payment_method = constraints::check_intent(intent, now.date_naive())?;

    let entry = DonationEntry {
        amount: intent.donation_amount,
        date: intent.donation_date,
        payment_method,
        notes: intent.notes.clone(),
    };

    let Some(mut donor) = existing else {
        let donor = Donor {
            id: Uuid::new_v4(),
            full_name: intent.full_name.clone(),
            email: intent.email.clone(),
            phone: intent.phone.clone(),
            address: intent.address.clone(),
            donation_amount: intent.donation_amount,
            donation_date: intent.donation_date,
            payment_method,
            notes: intent.notes.clone(),
            total_donated: intent.donation_amount,
            donation_history: vec![entry.clone()],
            last_donated: intent.donation_date,
            is_active: true,
            source,
            created_at: now,
            updated_at: now,
        };
        return Ok(UpsertPlan {
            kind: UpsertKind::Created,
            donor,
            entry,
        });
    };

    if donor.email != intent.email {
        return Err(PersistenceError::constraint(format!(
            "Donation for {} cannot be merged into donor {}",
            intent.email, donor.email
        )));
    }

    donor.donation_history.push(entry.clone());
    donor.total_donated += intent.donation_amount;
    // Keeps lastDonated equal to the latest history date even when rows
    // arrive out of chronological order.
    donor.last_donated = donor.last_donated.max(intent.donation_date);

    donor.donation_amount = intent.donation_amount;
    donor.donation_date = intent.donation_date;
    donor.payment_method = payment_method;
    donor.notes = intent.notes.clone();

    overwrite_if_changed(&mut donor.full_name, &intent.full_name);
    overwrite_if_changed(&mut donor.phone, &intent.phone);
    overwrite_if_changed(&mut donor.address, &intent.address);

    donor.updated_at = now;

    Ok(UpsertPlan {
        kind: UpsertKind::Merged,
        donor,
        entry,
    })
}

fn overwrite_if_changed(current: &mut String, incoming: &str) {
    if !incoming.is_empty() && incoming != current.as_str() {
        *current = incoming.to_string();
    }
}
