use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewPaymentSession, PaymentSession, PaymentStatus},
    error::{AppError, Result},
    repository::PaymentSessionRepository,
};

#[derive(FromRow)]
struct PaymentSessionRow {
    id: String,
    transaction_id: String,
    status: String,
    form_data: String,
    success_url: String,
    fail_url: String,
    cancel_url: String,
    gateway_session_key: Option<String>,
    gateway_url: Option<String>,
    validation_payload: Option<String>,
    expires_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const SESSION_COLUMNS: &str = "id, transaction_id, status, form_data, success_url, fail_url, \
                               cancel_url, gateway_session_key, gateway_url, validation_payload, \
                               expires_at, created_at, updated_at";

pub struct SqlitePaymentSessionRepository {
    pool: SqlitePool,
}

impl SqlitePaymentSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: PaymentSessionRow) -> Result<PaymentSession> {
        let validation_payload = row
            .validation_payload
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| AppError::Database(format!("Invalid validation payload: {}", e)))?;

        Ok(PaymentSession {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            transaction_id: row.transaction_id,
            status: row.status.parse().map_err(AppError::Database)?,
            form: serde_json::from_str(&row.form_data)
                .map_err(|e| AppError::Database(format!("Invalid form data: {}", e)))?,
            success_url: row.success_url,
            fail_url: row.fail_url,
            cancel_url: row.cancel_url,
            gateway_session_key: row.gateway_session_key,
            gateway_url: row.gateway_url,
            validation_payload,
            expires_at: DateTime::from_naive_utc_and_offset(row.expires_at, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentSessionRepository for SqlitePaymentSessionRepository {
    async fn create(&self, session: NewPaymentSession) -> Result<PaymentSession> {
        let purged = self.purge_expired().await?;
        if purged > 0 {
            tracing::debug!("Purged {} expired member payment sessions", purged);
        }

        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let form_data = serde_json::to_string(&session.form)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO member_payment_sessions (
                id, transaction_id, status, form_data, success_url, fail_url,
                cancel_url, gateway_session_key, gateway_url, expires_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&session.transaction_id)
        .bind(PaymentStatus::Pending.as_str())
        .bind(&form_data)
        .bind(&session.success_url)
        .bind(&session.fail_url)
        .bind(&session.cancel_url)
        .bind(&session.gateway_session_key)
        .bind(&session.gateway_url)
        .bind(session.expires_at.naive_utc())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                format!("Transaction {} already exists", session.transaction_id),
            ),
            e => AppError::Database(e.to_string()),
        })?;

        let row = sqlx::query_as::<_, PaymentSessionRow>(&format!(
            "SELECT {} FROM member_payment_sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Self::row_to_session(row)
    }

    async fn find_active_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentSession>> {
        let row = sqlx::query_as::<_, PaymentSessionRow>(&format!(
            "SELECT {} FROM member_payment_sessions WHERE transaction_id = ? AND expires_at > ?",
            SESSION_COLUMNS
        ))
        .bind(transaction_id)
        .bind(Utc::now().naive_utc())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_session).transpose()
    }

    async fn transition_status(
        &self,
        transaction_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        validation_payload: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let payload = validation_payload
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE member_payment_sessions
            SET status = ?,
                validation_payload = COALESCE(?, validation_payload),
                updated_at = ?
            WHERE transaction_id = ? AND status = ?
            "#
        )
        .bind(to.as_str())
        .bind(payload)
        .bind(Utc::now().naive_utc())
        .bind(transaction_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM member_payment_sessions WHERE expires_at <= ?")
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
