use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::DbPool;
use crate::edits;
use crate::error::{PersistenceError, Result};
use crate::store::DonorStore;
use crate::types::{
    DonationEntry, DonationIntent, Donor, DonorPatch, DonorSource, NewDonor, PaymentMethod,
};
use crate::upsert::{self, UpsertKind, Upserted};

const DONOR_COLUMNS: &str = "donor_id, full_name, email, phone, address, donation_amount, \
     donation_date, payment_method, notes, total_donated, last_donated, is_active, source, \
     created_at, updated_at";

#[derive(Debug, FromRow)]
struct DonorRow {
    donor_id: Uuid,
    full_name: String,
    email: String,
    phone: String,
    address: String,
    donation_amount: f64,
    donation_date: NaiveDate,
    payment_method: PaymentMethod,
    notes: String,
    total_donated: f64,
    last_donated: NaiveDate,
    is_active: bool,
    source: DonorSource,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DonorRow {
    fn into_donor(self, donation_history: Vec<DonationEntry>) -> Donor {
        Donor {
            id: self.donor_id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            donation_amount: self.donation_amount,
            donation_date: self.donation_date,
            payment_method: self.payment_method,
            notes: self.notes,
            total_donated: self.total_donated,
            donation_history,
            last_donated: self.last_donated,
            is_active: self.is_active,
            source: self.source,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    donor_id: Uuid,
    amount: f64,
    donation_date: NaiveDate,
    payment_method: PaymentMethod,
    notes: String,
}

impl From<HistoryRow> for DonationEntry {
    fn from(row: HistoryRow) -> Self {
        DonationEntry {
            amount: row.amount,
            date: row.donation_date,
            payment_method: row.payment_method,
            notes: row.notes,
        }
    }
}

/// Postgres-backed [`DonorStore`]. Every write runs in its own transaction
/// with the donor row locked; the unique index on `email` arbitrates
/// concurrent first inserts.
#[derive(Clone)]
pub struct PgDonorStore {
    pool: DbPool,
}

impl PgDonorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

async fn load_history(conn: &mut PgConnection, donor_id: Uuid) -> Result<Vec<DonationEntry>> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
            SELECT donor_id, amount, donation_date, payment_method, notes
            FROM donation_history
            WHERE donor_id = $1
            ORDER BY seq
        "#,
    )
    .bind(donor_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(DonationEntry::from).collect())
}

async fn fetch_donor(
    conn: &mut PgConnection,
    filter: &str,
    key: DonorKey<'_>,
    lock: bool,
) -> Result<Option<Donor>> {
    let sql = format!(
        "SELECT {DONOR_COLUMNS} FROM donors WHERE {filter} = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let query = sqlx::query_as::<_, DonorRow>(&sql);
    let row = match key {
        DonorKey::Id(id) => query.bind(id).fetch_optional(&mut *conn).await?,
        DonorKey::Email(email) => query.bind(email).fetch_optional(&mut *conn).await?,
    };

    let Some(row) = row else {
        return Ok(None);
    };
    let history = load_history(conn, row.donor_id).await?;
    Ok(Some(row.into_donor(history)))
}

#[derive(Clone, Copy)]
enum DonorKey<'a> {
    Id(Uuid),
    Email(&'a str),
}

async fn fetch_by_id(conn: &mut PgConnection, id: Uuid, lock: bool) -> Result<Donor> {
    fetch_donor(conn, "donor_id", DonorKey::Id(id), lock)
        .await?
        .ok_or(PersistenceError::NotFound(id))
}

async fn insert_donor(conn: &mut PgConnection, donor: &Donor) -> Result<()> {
    sqlx::query(
        r#"
            INSERT INTO donors (
                donor_id, full_name, email, phone, address, donation_amount,
                donation_date, payment_method, notes, total_donated, last_donated,
                is_active, source, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(donor.id)
    .bind(&donor.full_name)
    .bind(&donor.email)
    .bind(&donor.phone)
    .bind(&donor.address)
    .bind(donor.donation_amount)
    .bind(donor.donation_date)
    .bind(donor.payment_method)
    .bind(&donor.notes)
    .bind(donor.total_donated)
    .bind(donor.last_donated)
    .bind(donor.is_active)
    .bind(donor.source)
    .bind(donor.created_at)
    .bind(donor.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|err| PersistenceError::from_insert(err, &donor.email))?;
    Ok(())
}

async fn update_donor(conn: &mut PgConnection, donor: &Donor) -> Result<()> {
    let result = sqlx::query(
        r#"
            UPDATE donors
            SET full_name = $2,
                phone = $3,
                address = $4,
                donation_amount = $5,
                donation_date = $6,
                payment_method = $7,
                notes = $8,
                total_donated = $9,
                last_donated = $10,
                is_active = $11,
                source = $12,
                updated_at = $13
            WHERE donor_id = $1
        "#,
    )
    .bind(donor.id)
    .bind(&donor.full_name)
    .bind(&donor.phone)
    .bind(&donor.address)
    .bind(donor.donation_amount)
    .bind(donor.donation_date)
    .bind(donor.payment_method)
    .bind(&donor.notes)
    .bind(donor.total_donated)
    .bind(donor.last_donated)
    .bind(donor.is_active)
    .bind(donor.source)
    .bind(donor.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PersistenceError::NotFound(donor.id));
    }
    Ok(())
}

async fn insert_history_entry(
    conn: &mut PgConnection,
    donor_id: Uuid,
    seq: usize,
    entry: &DonationEntry,
) -> Result<()> {
    let seq = i32::try_from(seq)
        .map_err(|_| PersistenceError::Corrupt(format!("history too long for donor {donor_id}")))?;

    sqlx::query(
        r#"
            INSERT INTO donation_history (donor_id, seq, amount, donation_date, payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(donor_id)
    .bind(seq)
    .bind(entry.amount)
    .bind(entry.date)
    .bind(entry.payment_method)
    .bind(&entry.notes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn rewrite_history(conn: &mut PgConnection, donor: &Donor) -> Result<()> {
    sqlx::query("DELETE FROM donation_history WHERE donor_id = $1")
        .bind(donor.id)
        .execute(&mut *conn)
        .await?;

    for (seq, entry) in donor.donation_history.iter().enumerate() {
        insert_history_entry(conn, donor.id, seq, entry).await?;
    }
    Ok(())
}

#[async_trait]
impl DonorStore for PgDonorStore {
    async fn upsert_donation(
        &self,
        intent: &DonationIntent,
        source: DonorSource,
        now: DateTime<Utc>,
    ) -> Result<Upserted> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_donor(&mut tx, "email", DonorKey::Email(&intent.email), true).await?;
        let plan = upsert::plan_upsert(existing, intent, source, now)?;
        let seq = plan.donor.donation_history.len() - 1;

        match plan.kind {
            UpsertKind::Created => insert_donor(&mut tx, &plan.donor).await?,
            UpsertKind::Merged => update_donor(&mut tx, &plan.donor).await?,
        }
        insert_history_entry(&mut tx, plan.donor.id, seq, &plan.entry).await?;

        tx.commit().await?;
        Ok(plan.into())
    }

    async fn list(&self) -> Result<Vec<Donor>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, DonorRow>(&format!(
            "SELECT {DONOR_COLUMNS} FROM donors ORDER BY created_at DESC, email"
        ))
        .fetch_all(&mut *conn)
        .await?;

        let history_rows = sqlx::query_as::<_, HistoryRow>(
            r#"
                SELECT donor_id, amount, donation_date, payment_method, notes
                FROM donation_history
                ORDER BY donor_id, seq
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut histories: HashMap<Uuid, Vec<DonationEntry>> = HashMap::new();
        for row in history_rows {
            histories.entry(row.donor_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let history = histories.remove(&row.donor_id).unwrap_or_default();
                row.into_donor(history)
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Donor> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id, false).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Donor>> {
        let mut conn = self.pool.acquire().await?;
        let email = email.trim().to_lowercase();
        fetch_donor(&mut conn, "email", DonorKey::Email(&email), false).await
    }

    async fn replace(&self, id: Uuid, input: NewDonor, now: DateTime<Utc>) -> Result<Donor> {
        let mut tx = self.pool.begin().await?;
        let existing = fetch_by_id(&mut tx, id, true).await?;
        let replaced = edits::replace_donor(&existing, input, now)?;

        update_donor(&mut tx, &replaced).await?;
        rewrite_history(&mut tx, &replaced).await?;

        tx.commit().await?;
        Ok(replaced)
    }

    async fn update(&self, id: Uuid, patch: DonorPatch, now: DateTime<Utc>) -> Result<Donor> {
        let mut tx = self.pool.begin().await?;
        let existing = fetch_by_id(&mut tx, id, true).await?;
        let updated = edits::apply_patch(existing, patch, now)?;

        update_donor(&mut tx, &updated).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<Donor> {
        let mut tx = self.pool.begin().await?;
        let donor = fetch_by_id(&mut tx, id, true).await?;

        sqlx::query("DELETE FROM donors WHERE donor_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(donor)
    }

    async fn rewrite_aggregates(
        &self,
        id: Uuid,
        total_donated: f64,
        last_donated: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
                UPDATE donors
                SET total_donated = $2,
                    last_donated = $3,
                    updated_at = $4
                WHERE donor_id = $1
            "#,
        )
        .bind(id)
        .bind(total_donated)
        .bind(last_donated)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }
}
