use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::edits;
use crate::error::{PersistenceError, Result};
use crate::store::DonorStore;
use crate::types::{DonationIntent, Donor, DonorPatch, DonorSource, NewDonor};
use crate::upsert::{self, Upserted};

#[derive(Debug, Default)]
struct Inner {
    donors: HashMap<Uuid, Donor>,
    by_email: HashMap<String, Uuid>,
}

impl Inner {
    fn insert(&mut self, donor: Donor) -> Result<()> {
        if let Some(owner) = self.by_email.get(&donor.email) {
            if *owner != donor.id {
                return Err(PersistenceError::DuplicateEmail(donor.email));
            }
        }
        self.by_email.insert(donor.email.clone(), donor.id);
        self.donors.insert(donor.id, donor);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<&Donor> {
        self.donors.get(&id).ok_or(PersistenceError::NotFound(id))
    }
}

/// Process-local store used by tests, dry runs and `serve --in-memory`.
///
/// A single write lock serializes upserts, which gives the same guarantees
/// as the Postgres transaction plus unique index.
#[derive(Debug, Default)]
pub struct MemoryDonorStore {
    inner: RwLock<Inner>,
}

impl MemoryDonorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records as-is, without validation.
    pub fn with_donors(donors: impl IntoIterator<Item = Donor>) -> Result<Self> {
        let mut inner = Inner::default();
        for donor in donors {
            inner.insert(donor)?;
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.donors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DonorStore for MemoryDonorStore {
    async fn upsert_donation(
        &self,
        intent: &DonationIntent,
        source: DonorSource,
        now: DateTime<Utc>,
    ) -> Result<Upserted> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .by_email
            .get(&intent.email)
            .and_then(|id| inner.donors.get(id))
            .cloned();

        let plan = upsert::plan_upsert(existing, intent, source, now)?;
        inner.insert(plan.donor.clone())?;
        Ok(plan.into())
    }

    async fn list(&self) -> Result<Vec<Donor>> {
        let inner = self.inner.read().await;
        let mut donors: Vec<Donor> = inner.donors.values().cloned().collect();
        donors.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(donors)
    }

    async fn get(&self, id: Uuid) -> Result<Donor> {
        self.inner.read().await.get(id).cloned()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Donor>> {
        let inner = self.inner.read().await;
        let email = email.trim().to_lowercase();
        Ok(inner
            .by_email
            .get(&email)
            .and_then(|id| inner.donors.get(id))
            .cloned())
    }

    async fn replace(&self, id: Uuid, input: NewDonor, now: DateTime<Utc>) -> Result<Donor> {
        let mut inner = self.inner.write().await;
        let replaced = edits::replace_donor(inner.get(id)?, input, now)?;
        inner.insert(replaced.clone())?;
        Ok(replaced)
    }

    async fn update(&self, id: Uuid, patch: DonorPatch, now: DateTime<Utc>) -> Result<Donor> {
        let mut inner = self.inner.write().await;
        let updated = edits::apply_patch(inner.get(id)?.clone(), patch, now)?;
        inner.insert(updated.clone())?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<Donor> {
        let mut inner = self.inner.write().await;
        let donor = inner
            .donors
            .remove(&id)
            .ok_or(PersistenceError::NotFound(id))?;
        inner.by_email.remove(&donor.email);
        Ok(donor)
    }

    async fn rewrite_aggregates(
        &self,
        id: Uuid,
        total_donated: f64,
        last_donated: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let donor = inner
            .donors
            .get_mut(&id)
            .ok_or(PersistenceError::NotFound(id))?;
        donor.total_donated = total_donated;
        donor.last_donated = last_donated;
        donor.updated_at = now;
        Ok(())
    }
}
