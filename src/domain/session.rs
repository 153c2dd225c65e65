use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{member::MemberFormData, payment::PaymentStatus};

/// Short-lived record tying a gateway session to the membership form that
/// started it. Lives until it is completed once or its expiry passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: Uuid,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub form: MemberFormData,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub gateway_session_key: Option<String>,
    pub gateway_url: Option<String>,
    pub validation_payload: Option<serde_json::Value>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentSession {
    pub transaction_id: String,
    pub form: MemberFormData,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub gateway_session_key: Option<String>,
    pub gateway_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}
