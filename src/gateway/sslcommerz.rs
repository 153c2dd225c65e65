use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::GatewayConfig,
    domain::payment::format_major,
    error::{AppError, Result},
    gateway::{GatewayValidation, InitiationOutcome, PaymentGateway, SessionRequest},
};

const INITIATION_PATH: &str = "/gwprocess/v4/api.php";
const VALIDATION_PATH: &str = "/validator/api/validationserverAPI.php";

/// SSLCommerz hosted checkout over plain HTTPS.
pub struct SslCommerzGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Debug, Deserialize)]
struct InitiationResponse {
    status: Option<String>,
    failedreason: Option<String>,
    #[serde(rename = "GatewayPageURL")]
    gateway_page_url: Option<String>,
    sessionkey: Option<String>,
}

impl SslCommerzGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build gateway HTTP client: {}", e)))?;

        if config.store_id.is_empty() || config.store_password.is_empty() {
            tracing::warn!("Payment gateway store credentials are not configured");
        }

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base().trim_end_matches('/'), path)
    }

    fn initiation_form(&self, request: &SessionRequest) -> Vec<(&'static str, String)> {
        vec![
            ("store_id", self.config.store_id.clone()),
            ("store_passwd", self.config.store_password.clone()),
            ("total_amount", format_major(request.amount_minor)),
            ("currency", self.config.currency.clone()),
            ("tran_id", request.transaction_id.clone()),
            ("success_url", request.success_url.clone()),
            ("fail_url", request.fail_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("cus_name", request.customer.name.clone()),
            ("cus_email", request.customer.email.clone()),
            ("cus_add1", "Dhaka".to_string()),
            ("cus_city", "Dhaka".to_string()),
            ("cus_country", "Bangladesh".to_string()),
            ("cus_phone", request.customer.phone.clone()),
            ("shipping_method", "NO".to_string()),
            ("product_name", request.product_name.clone()),
            ("product_category", request.product_category.clone()),
            ("product_profile", "non-physical".to_string()),
        ]
    }
}

fn interpret_initiation(response: InitiationResponse) -> InitiationOutcome {
    let succeeded = response
        .status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("SUCCESS"))
        .unwrap_or(false);

    match response.gateway_page_url.filter(|url| !url.is_empty()) {
        Some(url) if succeeded => InitiationOutcome::Redirect {
            url,
            session_key: response.sessionkey,
        },
        _ => InitiationOutcome::Rejected {
            reason: response
                .failedreason
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "Payment gateway initialization failed".to_string()),
        },
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzGateway {
    async fn initiate_session(&self, request: &SessionRequest) -> InitiationOutcome {
        let response = match self
            .client
            .post(self.url(INITIATION_PATH))
            .form(&self.initiation_form(request))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    "Gateway initiation request failed for {}: {}",
                    request.transaction_id,
                    e
                );
                return InitiationOutcome::Unavailable { reason: e.to_string() };
            }
        };

        if response.status().is_server_error() {
            return InitiationOutcome::Unavailable {
                reason: format!("Gateway responded with HTTP {}", response.status()),
            };
        }

        match response.json::<InitiationResponse>().await {
            Ok(body) => {
                let outcome = interpret_initiation(body);
                if let InitiationOutcome::Rejected { reason } = &outcome {
                    tracing::warn!(
                        "Gateway rejected session for {}: {}",
                        request.transaction_id,
                        reason
                    );
                }
                outcome
            }
            Err(e) => InitiationOutcome::Unavailable {
                reason: format!("Unreadable gateway response: {}", e),
            },
        }
    }

    async fn validate_transaction(&self, val_id: &str) -> Result<GatewayValidation> {
        let response = self
            .client
            .get(self.url(VALIDATION_PATH))
            .query(&[
                ("val_id", val_id),
                ("store_id", self.config.store_id.as_str()),
                ("store_passwd", self.config.store_password.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| AppError::GatewayUnavailable(format!("Validation request failed: {}", e)))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::GatewayUnavailable(format!("Unreadable validation response: {}", e)))?;

        Ok(GatewayValidation::from_payload(payload))
    }
}
