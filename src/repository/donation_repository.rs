use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Donation, DonationFilters, NewDonation, PaymentStatus},
    error::{AppError, Result},
    repository::DonationRepository,
};

#[derive(FromRow)]
struct DonationRow {
    id: String,
    transaction_id: String,
    purpose: String,
    contact: String,
    name: Option<String>,
    behalf: Option<String>,
    amount_minor: i64,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const DONATION_COLUMNS: &str = "id, transaction_id, purpose, contact, name, behalf, \
                                amount_minor, status, created_at, updated_at";

pub struct SqliteDonationRepository {
    pool: SqlitePool,
}

impl SqliteDonationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_donation(row: DonationRow) -> Result<Donation> {
        Ok(Donation {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            transaction_id: row.transaction_id,
            purpose: row.purpose,
            contact: row.contact,
            name: row.name,
            behalf: row.behalf,
            amount_minor: row.amount_minor,
            status: row.status.parse().map_err(AppError::Database)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    /// Appends the WHERE clause shared by list, count and total queries.
    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &DonationFilters) {
        builder.push(" WHERE 1 = 1");
        if let Some(status) = filters.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(transaction_id) = &filters.transaction_id {
            builder.push(" AND transaction_id = ").push_bind(transaction_id.clone());
        }
        if let Some(purpose) = &filters.purpose {
            builder.push(" AND purpose = ").push_bind(purpose.clone());
        }
        if let Some(contact) = &filters.contact {
            builder.push(" AND contact = ").push_bind(contact.clone());
        }
        if let Some(start) = filters.start_date {
            builder.push(" AND created_at >= ").push_bind(start.naive_utc());
        }
        if let Some(end) = filters.end_date {
            builder.push(" AND created_at <= ").push_bind(end.naive_utc());
        }
    }
}

#[async_trait]
impl DonationRepository for SqliteDonationRepository {
    async fn create(&self, donation: NewDonation) -> Result<Donation> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO donations (
                id, transaction_id, purpose, contact, name, behalf,
                amount_minor, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&donation.transaction_id)
        .bind(&donation.purpose)
        .bind(&donation.contact)
        .bind(&donation.name)
        .bind(&donation.behalf)
        .bind(donation.amount_minor)
        .bind(PaymentStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                format!("Transaction {} already exists", donation.transaction_id),
            ),
            e => AppError::Database(e.to_string()),
        })?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created donation".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {} FROM donations WHERE id = ?",
            DONATION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_donation).transpose()
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {} FROM donations WHERE transaction_id = ?",
            DONATION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_donation).transpose()
    }

    async fn transition_status(
        &self,
        transaction_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE donations
            SET status = ?, updated_at = ?
            WHERE transaction_id = ? AND status = ?
            "#
        )
        .bind(to.as_str())
        .bind(Utc::now().naive_utc())
        .bind(transaction_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, filters: &DonationFilters, limit: i64, offset: i64) -> Result<Vec<Donation>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM donations", DONATION_COLUMNS));
        Self::push_filters(&mut builder, filters);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<DonationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_donation)
            .collect()
    }

    async fn count(&self, filters: &DonationFilters) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM donations");
        Self::push_filters(&mut builder, filters);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn total_amount(&self, filters: &DonationFilters) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COALESCE(SUM(amount_minor), 0) FROM donations");
        Self::push_filters(&mut builder, filters);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_by_contacts(&self, contacts: &[String]) -> Result<Vec<Donation>> {
        if contacts.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM donations WHERE contact IN (",
            DONATION_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for contact in contacts {
            separated.push_bind(contact.clone());
        }
        separated.push_unseparated(") ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<DonationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_donation)
            .collect()
    }
}
