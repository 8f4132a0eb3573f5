//! Donor storage abstraction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{DonationIntent, Donor, DonorPatch, DonorSource, NewDonor};
use crate::upsert::Upserted;

mod memory;

pub use memory::MemoryDonorStore;

/// Implementations must enforce email uniqueness themselves and apply each
/// upsert (history append plus aggregate update) atomically.
#[async_trait]
pub trait DonorStore: Send + Sync {
    /// Creates the donor for `intent.email` or merges the donation into it.
    async fn upsert_donation(
        &self,
        intent: &DonationIntent,
        source: DonorSource,
        now: DateTime<Utc>,
    ) -> Result<Upserted>;

    /// All donors, newest first, with their history.
    async fn list(&self) -> Result<Vec<Donor>>;

    async fn get(&self, id: Uuid) -> Result<Donor>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Donor>>;

    async fn replace(&self, id: Uuid, input: NewDonor, now: DateTime<Utc>) -> Result<Donor>;

    async fn update(&self, id: Uuid, patch: DonorPatch, now: DateTime<Utc>) -> Result<Donor>;

    /// Removes the donor and its history, returning what was deleted.
    async fn delete(&self, id: Uuid) -> Result<Donor>;

    /// Overwrites the stored aggregates without touching the history.
    async fn rewrite_aggregates(
        &self,
        id: Uuid,
        total_donated: f64,
        last_donated: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<()>;
}
