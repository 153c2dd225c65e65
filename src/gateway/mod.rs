use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::payment::{parse_major, to_minor_units, MINOR_PER_MAJOR},
    error::{AppError, Result},
};

pub mod sslcommerz;

pub use sslcommerz::SslCommerzGateway;

#[derive(Debug, Clone)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Everything the gateway needs to open a hosted payment page.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub transaction_id: String,
    pub amount_minor: i64,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub customer: Customer,
    pub product_name: String,
    pub product_category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiationOutcome {
    Redirect {
        url: String,
        session_key: Option<String>,
    },
    /// The gateway answered but refused the session.
    Rejected { reason: String },
    /// The gateway could not be reached or answered with garbage.
    Unavailable { reason: String },
}

impl InitiationOutcome {
    /// Splits the outcome into the redirect details or the matching error.
    pub fn into_redirect(self) -> Result<(String, Option<String>)> {
        match self {
            InitiationOutcome::Redirect { url, session_key } => Ok((url, session_key)),
            InitiationOutcome::Rejected { reason } => Err(AppError::GatewayInitiationFailed(reason)),
            InitiationOutcome::Unavailable { reason } => Err(AppError::GatewayUnavailable(reason)),
        }
    }
}

/// The gateway's authoritative record of a transaction, as returned by its
/// validation endpoint. `raw` keeps the full payload for auditing.
#[derive(Debug, Clone)]
pub struct GatewayValidation {
    pub status: Option<String>,
    pub transaction_id: Option<String>,
    pub val_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub raw: Value,
}

impl GatewayValidation {
    pub fn from_payload(raw: Value) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        // The amount comes back as "500.00" or as a bare number depending on the API version
        let amount_minor = match raw.get("amount") {
            Some(Value::String(s)) => parse_major(s),
            Some(Value::Number(n)) => n.as_f64().and_then(to_minor_units),
            _ => None,
        };

        Self {
            status: text("status"),
            transaction_id: text("tran_id"),
            val_id: text("val_id"),
            amount_minor,
            currency: text("currency"),
            raw,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.status.as_deref(), Some("VALID") | Some("VALIDATED"))
    }

    /// Rejects the validation unless it is confirmed, belongs to
    /// `transaction_id`, and its amount is within `tolerance_major` of
    /// `expected_minor`.
    pub fn ensure_matches(
        &self,
        transaction_id: &str,
        expected_minor: i64,
        tolerance_major: i64,
    ) -> Result<()> {
        if !self.is_valid() {
            return Err(AppError::ValidationMismatch(format!(
                "Payment not valid (status: {})",
                self.status.as_deref().unwrap_or("unknown")
            )));
        }

        if self.transaction_id.as_deref() != Some(transaction_id) {
            return Err(AppError::ValidationMismatch(
                "Transaction ID mismatch".to_string(),
            ));
        }

        let paid = self.amount_minor.ok_or_else(|| {
            AppError::ValidationMismatch("Validated amount is missing".to_string())
        })?;
        if (paid - expected_minor).abs() > tolerance_major * MINOR_PER_MAJOR {
            return Err(AppError::ValidationMismatch("Amount mismatch".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted payment session. Never touches local state.
    async fn initiate_session(&self, request: &SessionRequest) -> InitiationOutcome;

    /// Fetches the gateway's record for a validation id.
    async fn validate_transaction(&self, val_id: &str) -> Result<GatewayValidation>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_accepts_string_and_numeric_amounts() {
        let from_string = GatewayValidation::from_payload(json!({
            "status": "VALID", "tran_id": "MEM-1", "amount": "50000.00"
        }));
        let from_number = GatewayValidation::from_payload(json!({
            "status": "VALIDATED", "tran_id": "MEM-1", "amount": 50000
        }));
        assert_eq!(from_string.amount_minor, Some(5_000_000));
        assert_eq!(from_number.amount_minor, Some(5_000_000));
        assert!(from_string.ensure_matches("MEM-1", 5_000_000, 1).is_ok());
        assert!(from_number.ensure_matches("MEM-1", 5_000_000, 1).is_ok());
    }

    #[test]
    fn test_validation_rejects_wrong_transaction() {
        let validation = GatewayValidation::from_payload(json!({
            "status": "VALID", "tran_id": "MEM-2", "amount": "500.00"
        }));
        assert!(matches!(
            validation.ensure_matches("MEM-1", 50_000, 1),
            Err(AppError::ValidationMismatch(_))
        ));
    }

    #[test]
    fn test_validation_amount_tolerance_is_one_unit() {
        let validation = GatewayValidation::from_payload(json!({
            "status": "VALID", "tran_id": "MEM-1", "amount": "500.99"
        }));
        assert!(validation.ensure_matches("MEM-1", 50_000, 1).is_ok());
        assert!(validation.ensure_matches("MEM-1", 49_800, 1).is_err());
    }

    #[test]
    fn test_validation_rejects_unconfirmed_status() {
        let validation = GatewayValidation::from_payload(json!({
            "status": "INVALID_TRANSACTION", "tran_id": "MEM-1", "amount": "500.00"
        }));
        assert!(!validation.is_valid());
        assert!(validation.ensure_matches("MEM-1", 50_000, 1).is_err());
    }

    #[test]
    fn test_outcome_maps_to_typed_errors() {
        let rejected = InitiationOutcome::Rejected { reason: "Store credential error".into() };
        assert!(matches!(
            rejected.into_redirect(),
            Err(AppError::GatewayInitiationFailed(reason)) if reason == "Store credential error"
        ));
        let unavailable = InitiationOutcome::Unavailable { reason: "timeout".into() };
        assert!(matches!(unavailable.into_redirect(), Err(AppError::GatewayUnavailable(_))));
    }
}
