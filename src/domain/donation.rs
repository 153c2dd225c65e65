use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{payment::PaymentStatus, user::validate_contact};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub transaction_id: String,
    pub purpose: String,
    /// Email or phone of the donor.
    pub contact: String,
    pub name: Option<String>,
    pub behalf: Option<String>,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub transaction_id: String,
    pub purpose: String,
    pub contact: String,
    pub name: Option<String>,
    pub behalf: Option<String>,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDonationRequest {
    #[validate(length(min = 1, message = "Purpose is required"))]
    pub purpose: String,
    #[validate(custom(function = "validate_contact"))]
    pub contact: String,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub behalf: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DonationFilters {
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub purpose: Option<String>,
    pub contact: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
