use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        ApplicationStatus, MemberApplication, MemberApplicationFilters, MemberFormData,
        NewMemberApplication, PaymentStatus,
    },
    error::{AppError, Result},
    repository::MemberApplicationRepository,
};

// Form fields are flattened into columns so admins can filter on them
#[derive(FromRow)]
struct MemberApplicationRow {
    id: String,
    transaction_id: Option<String>,
    member_type: String,
    amount_minor: i64,
    name: String,
    father_name: String,
    gender: String,
    mobile: String,
    is_overseas: bool,
    email: Option<String>,
    occupation: String,
    reference: Option<String>,
    address: String,
    payment_method: String,
    payment_document_url: Option<String>,
    payment_status: String,
    application_status: String,
    gateway_val_id: Option<String>,
    gateway_payload: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const APPLICATION_COLUMNS: &str = "id, transaction_id, member_type, amount_minor, name, father_name, \
                                   gender, mobile, is_overseas, email, occupation, reference, address, \
                                   payment_method, payment_document_url, payment_status, \
                                   application_status, gateway_val_id, gateway_payload, \
                                   created_at, updated_at";

pub struct SqliteMemberApplicationRepository {
    pool: SqlitePool,
}

impl SqliteMemberApplicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_application(row: MemberApplicationRow) -> Result<MemberApplication> {
        let gateway_payload = row
            .gateway_payload
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| AppError::Database(format!("Invalid gateway payload: {}", e)))?;

        Ok(MemberApplication {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            transaction_id: row.transaction_id,
            form: MemberFormData {
                member_type: row.member_type.parse().map_err(AppError::Database)?,
                amount_minor: row.amount_minor,
                name: row.name,
                father_name: row.father_name,
                gender: row.gender.parse().map_err(AppError::Database)?,
                mobile: row.mobile,
                is_overseas: row.is_overseas,
                email: row.email,
                occupation: row.occupation,
                reference: row.reference,
                address: row.address,
            },
            payment_method: row.payment_method.parse().map_err(AppError::Database)?,
            payment_document_url: row.payment_document_url,
            payment_status: row.payment_status.parse().map_err(AppError::Database)?,
            application_status: row.application_status.parse().map_err(AppError::Database)?,
            gateway_val_id: row.gateway_val_id,
            gateway_payload,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &MemberApplicationFilters) {
        builder.push(" WHERE 1 = 1");
        if let Some(status) = filters.application_status {
            builder.push(" AND application_status = ").push_bind(status.as_str());
        }
        if let Some(status) = filters.payment_status {
            builder.push(" AND payment_status = ").push_bind(status.as_str());
        }
        if let Some(member_type) = filters.member_type {
            builder.push(" AND member_type = ").push_bind(member_type.as_str());
        }
        if let Some(term) = filters.search_term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            // SQLite LIKE is case-insensitive for ASCII
            let pattern = format!("%{}%", term);
            builder
                .push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR email LIKE ")
                .push_bind(pattern.clone())
                .push(" OR mobile LIKE ")
                .push_bind(pattern.clone())
                .push(" OR transaction_id LIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    async fn fetch_one_by(&self, column: &str, value: String) -> Result<Option<MemberApplication>> {
        let row = sqlx::query_as::<_, MemberApplicationRow>(&format!(
            "SELECT {} FROM member_applications WHERE {} = ?",
            APPLICATION_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_application).transpose()
    }
}

#[async_trait]
impl MemberApplicationRepository for SqliteMemberApplicationRepository {
    async fn create(&self, application: NewMemberApplication) -> Result<MemberApplication> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let form = &application.form;
        let gateway_payload = application
            .gateway_payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO member_applications (
                id, transaction_id, member_type, amount_minor, name, father_name,
                gender, mobile, is_overseas, email, occupation, reference, address,
                payment_method, payment_document_url, payment_status,
                application_status, gateway_val_id, gateway_payload,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&application.transaction_id)
        .bind(form.member_type.as_str())
        .bind(form.amount_minor)
        .bind(&form.name)
        .bind(&form.father_name)
        .bind(form.gender.as_str())
        .bind(&form.mobile)
        .bind(form.is_overseas)
        .bind(&form.email)
        .bind(&form.occupation)
        .bind(&form.reference)
        .bind(&form.address)
        .bind(application.payment_method.as_str())
        .bind(&application.payment_document_url)
        .bind(application.payment_status.as_str())
        .bind(application.application_status.as_str())
        .bind(&application.gateway_val_id)
        .bind(gateway_payload)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                "An application already exists for this transaction".to_string(),
            ),
            e => AppError::Database(e.to_string()),
        })?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created application".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MemberApplication>> {
        self.fetch_one_by("id", id.to_string()).await
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<MemberApplication>> {
        self.fetch_one_by("transaction_id", transaction_id.to_string()).await
    }

    async fn list(
        &self,
        filters: &MemberApplicationFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MemberApplication>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM member_applications",
            APPLICATION_COLUMNS
        ));
        Self::push_filters(&mut builder, filters);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<MemberApplicationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_application)
            .collect()
    }

    async fn count(&self, filters: &MemberApplicationFilters) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM member_applications");
        Self::push_filters(&mut builder, filters);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<MemberApplication> {
        let result = sqlx::query(
            "UPDATE member_applications SET application_status = ?, updated_at = ? WHERE id = ?"
        )
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member application not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated application".to_string())
        })
    }

    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<MemberApplication> {
        let result = sqlx::query(
            "UPDATE member_applications SET payment_status = ?, updated_at = ? WHERE id = ?"
        )
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member application not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated application".to_string())
        })
    }

    async fn delete_unapproved(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM member_applications WHERE id = ? AND application_status != ?",
        )
        .bind(id.to_string())
        .bind(ApplicationStatus::Approved.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
