use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Settings,
    domain::*,
    error::{AppError, Result},
    gateway::{Customer, PaymentGateway, SessionRequest},
    repository::{DonationRepository, PaymentSessionRepository},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationInitiated {
    pub id: Uuid,
    pub url: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPaymentInitiated {
    pub url: String,
    pub transaction_id: String,
}

/// Opens gateway sessions. Local records are written only after the gateway
/// hands back a redirect URL, so a refused or unreachable gateway leaves no
/// trace in the database.
pub struct InitiationService {
    donation_repo: Arc<dyn DonationRepository>,
    session_repo: Arc<dyn PaymentSessionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    settings: Arc<Settings>,
}

impl InitiationService {
    pub fn new(
        donation_repo: Arc<dyn DonationRepository>,
        session_repo: Arc<dyn PaymentSessionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            donation_repo,
            session_repo,
            gateway,
            settings,
        }
    }

    fn callback_urls(&self, flow: PaymentFlow) -> (String, String, String) {
        let segment = flow.route_segment();
        (
            self.settings.callback_url(segment, CallbackOutcome::Success.as_str()),
            self.settings.callback_url(segment, CallbackOutcome::Fail.as_str()),
            self.settings.callback_url(segment, CallbackOutcome::Cancel.as_str()),
        )
    }

    pub async fn initiate_donation(&self, request: CreateDonationRequest) -> Result<DonationInitiated> {
        request.validate()?;

        let amount_minor = to_minor_units(request.amount)
            .ok_or_else(|| AppError::Validation("Amount must be greater than 0".to_string()))?;
        let contact = normalize_contact(&request.contact);
        let purpose = request.purpose.trim().to_string();
        let name = request.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let behalf = request.behalf.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());

        let transaction_id = PaymentFlow::Donation.generate_transaction_id();
        let (success_url, fail_url, cancel_url) = self.callback_urls(PaymentFlow::Donation);

        let session_request = SessionRequest {
            transaction_id: transaction_id.clone(),
            amount_minor,
            success_url,
            fail_url,
            cancel_url,
            customer: Customer {
                name: name.clone().unwrap_or_else(|| "Donor".to_string()),
                email: contact.clone(),
                phone: contact.clone(),
            },
            product_name: purpose.clone(),
            product_category: "Donation".to_string(),
        };

        let (url, _session_key) = self.gateway.initiate_session(&session_request).await.into_redirect()?;

        let donation = self
            .donation_repo
            .create(NewDonation {
                transaction_id: transaction_id.clone(),
                purpose,
                contact,
                name,
                behalf,
                amount_minor,
            })
            .await?;

        tracing::info!(
            "Donation {} initiated with transaction {} for {}",
            donation.id,
            transaction_id,
            format_major(amount_minor)
        );

        Ok(DonationInitiated {
            id: donation.id,
            url,
            transaction_id,
        })
    }

    pub async fn initiate_member_payment(&self, request: MemberFormRequest) -> Result<MemberPaymentInitiated> {
        let form = request.into_form_data()?;

        let transaction_id = PaymentFlow::Member.generate_transaction_id();
        let (success_url, fail_url, cancel_url) = self.callback_urls(PaymentFlow::Member);

        let session_request = SessionRequest {
            transaction_id: transaction_id.clone(),
            amount_minor: form.amount_minor,
            success_url: success_url.clone(),
            fail_url: fail_url.clone(),
            cancel_url: cancel_url.clone(),
            customer: Customer {
                name: form.name.clone(),
                email: form.email.clone().unwrap_or_else(|| form.mobile.clone()),
                phone: form.mobile.clone(),
            },
            product_name: form.member_type.label().to_string(),
            product_category: "Membership".to_string(),
        };

        let (url, session_key) = self.gateway.initiate_session(&session_request).await.into_redirect()?;

        let expires_at = Utc::now() + Duration::hours(self.settings.members.session_ttl_hours);
        self.session_repo
            .create(NewPaymentSession {
                transaction_id: transaction_id.clone(),
                form,
                success_url,
                fail_url,
                cancel_url,
                gateway_session_key: session_key,
                gateway_url: Some(url.clone()),
                expires_at,
            })
            .await?;

        tracing::info!(
            "Member payment session {} opened, expires at {}",
            transaction_id,
            expires_at
        );

        Ok(MemberPaymentInitiated { url, transaction_id })
    }
}
