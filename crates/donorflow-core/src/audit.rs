// crates/donorflow-core/src/audit.rs

//! Drift check between stored donor aggregates and their donation history.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::store::DonorStore;
use crate::types::DonationEntry;

const AMOUNT_TOLERANCE: f64 = 1e-6;

/// `(sum of amounts, latest date)`, or `None` for an empty history.
pub fn expected_aggregates(history: &[DonationEntry]) -> Option<(f64, NaiveDate)> {
    let last = history.iter().map(|entry| entry.date).max()?;
    let total = history.iter().map(|entry| entry.amount).sum();
    Some((total, last))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDrift {
    pub donor_id: Uuid,
    pub email: String,
    pub stored_total: f64,
    pub expected_total: f64,
    pub stored_last: NaiveDate,
    pub expected_last: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub checked: usize,
    pub drifted: Vec<AggregateDrift>,
    /// Donors with no history at all; nothing can be recomputed for them.
    pub without_history: Vec<Uuid>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.drifted.is_empty() && self.without_history.is_empty()
    }
}

pub async fn audit_aggregates<S>(store: &S) -> Result<AuditReport>
where
    S: DonorStore + ?Sized,
{
    let donors = store.list().await?;
    let mut report = AuditReport {
        checked: donors.len(),
        ..AuditReport::default()
    };

    for donor in donors {
        let Some((expected_total, expected_last)) = expected_aggregates(&donor.donation_history)
        else {
            warn!(donor_id = %donor.id, "donor has no donation history");
            report.without_history.push(donor.id);
            continue;
        };

        let total_drift = (donor.total_donated - expected_total).abs() > AMOUNT_TOLERANCE;
        if total_drift || donor.last_donated != expected_last {
            report.drifted.push(AggregateDrift {
                donor_id: donor.id,
                email: donor.email,
                stored_total: donor.total_donated,
                expected_total,
                stored_last: donor.last_donated,
                expected_last,
            });
        }
    }

    info!(
        checked = report.checked,
        drifted = report.drifted.len(),
        without_history = report.without_history.len(),
        "aggregate audit finished"
    );
    Ok(report)
}

/// Rewrites the aggregates of every drifted donor. Returns how many were fixed.
pub async fn apply_repairs<S>(store: &S, report: &AuditReport, now: DateTime<Utc>) -> Result<usize>
where
    S: DonorStore + ?Sized,
{
    for drift in &report.drifted {
        store
            .rewrite_aggregates(drift.donor_id, drift.expected_total, drift.expected_last, now)
            .await?;
        info!(donor_id = %drift.donor_id, email = %drift.email, "aggregates repaired");
    }
    Ok(report.drifted.len())
}
