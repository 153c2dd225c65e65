use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::payment::{to_minor_units, PaymentStatus, MINOR_PER_MAJOR};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Lifetime,
    Donor,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Lifetime => "lifetime",
            MemberType::Donor => "donor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MemberType::Lifetime => "Lifetime Member",
            MemberType::Donor => "Donor",
        }
    }

    pub fn minimum_amount_minor(&self) -> i64 {
        match self {
            MemberType::Lifetime => 100_000 * MINOR_PER_MAJOR,
            MemberType::Donor => 50_000 * MINOR_PER_MAJOR,
        }
    }
}

impl FromStr for MemberType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "lifetime" => Ok(MemberType::Lifetime),
            "donor" => Ok(MemberType::Donor),
            _ => Err(format!("Invalid member type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(format!("Invalid gender: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberPaymentMethod {
    Online,
    BankTransfer,
    BankDeposit,
}

impl MemberPaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberPaymentMethod::Online => "online",
            MemberPaymentMethod::BankTransfer => "bank_transfer",
            MemberPaymentMethod::BankDeposit => "bank_deposit",
        }
    }
}

impl FromStr for MemberPaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "online" => Ok(MemberPaymentMethod::Online),
            "bank_transfer" => Ok(MemberPaymentMethod::BankTransfer),
            "bank_deposit" => Ok(MemberPaymentMethod::BankDeposit),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::PendingApproval => "pending_approval",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::PendingApproval => "Pending Approval",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending_approval" => Ok(ApplicationStatus::PendingApproval),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(format!("Invalid application status: {}", s)),
        }
    }
}

/// Applicant details captured by the membership form. Stored as JSON on the
/// payment session and copied into the application on completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberFormData {
    #[serde(rename = "type")]
    pub member_type: MemberType,
    pub amount_minor: i64,
    pub name: String,
    pub father_name: String,
    pub gender: Gender,
    pub mobile: String,
    pub is_overseas: bool,
    pub email: Option<String>,
    pub occupation: String,
    pub reference: Option<String>,
    pub address: String,
}

/// Membership form as submitted by the website.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberFormRequest {
    #[serde(rename = "type")]
    pub member_type: MemberType,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "Father name is required"))]
    pub father_name: String,
    pub gender: Gender,
    #[validate(length(min = 1, message = "Mobile number is required"))]
    pub mobile: String,
    #[serde(default)]
    pub is_overseas: bool,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub occupation: Option<String>,
    /// Older forms send the district in place of the occupation.
    pub district: Option<String>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

impl MemberFormRequest {
    /// Runs field validation plus the cross-field membership rules.
    pub fn into_form_data(self) -> Result<MemberFormData> {
        self.validate()?;

        let occupation = self
            .occupation
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .or_else(|| self.district.as_deref().map(str::trim).filter(|d| !d.is_empty()))
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Occupation is required".to_string()))?;

        let amount_minor = to_minor_units(self.amount)
            .ok_or_else(|| AppError::Validation("Amount must be greater than zero".to_string()))?;
        if amount_minor < self.member_type.minimum_amount_minor() {
            return Err(AppError::Validation(
                "Amount is below the minimum for the selected member type".to_string(),
            ));
        }

        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        if self.is_overseas && email.is_none() {
            return Err(AppError::Validation(
                "Email is required for overseas members".to_string(),
            ));
        }

        Ok(MemberFormData {
            member_type: self.member_type,
            amount_minor,
            name: self.name.trim().to_string(),
            father_name: self.father_name.trim().to_string(),
            gender: self.gender,
            mobile: self.mobile.trim().to_string(),
            is_overseas: self.is_overseas,
            email,
            occupation,
            reference: self.reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            address: self.address.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberApplication {
    pub id: Uuid,
    pub transaction_id: Option<String>,
    pub form: MemberFormData,
    pub payment_method: MemberPaymentMethod,
    pub payment_document_url: Option<String>,
    pub payment_status: PaymentStatus,
    pub application_status: ApplicationStatus,
    pub gateway_val_id: Option<String>,
    pub gateway_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMemberApplication {
    pub transaction_id: Option<String>,
    pub form: MemberFormData,
    pub payment_method: MemberPaymentMethod,
    pub payment_document_url: Option<String>,
    pub payment_status: PaymentStatus,
    pub application_status: ApplicationStatus,
    pub gateway_val_id: Option<String>,
    pub gateway_payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberApplicationFilters {
    pub application_status: Option<ApplicationStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub member_type: Option<MemberType>,
    pub search_term: Option<String>,
}
