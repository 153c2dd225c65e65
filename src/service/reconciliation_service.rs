use std::sync::Arc;

use serde::Deserialize;

use crate::{
    config::GatewayConfig,
    domain::*,
    error::{AppError, Result},
    gateway::PaymentGateway,
    repository::{DonationRepository, MemberApplicationRepository, PaymentSessionRepository},
    service::account_service::AccountService,
};

/// Form body the gateway posts to the callback endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayCallback {
    pub tran_id: Option<String>,
    pub val_id: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
}

impl GatewayCallback {
    pub fn transaction_id(&self) -> Option<&str> {
        self.tran_id.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAck {
    pub transaction_id: String,
    pub status: PaymentStatus,
    /// False when the callback was a repeat and nothing was written.
    pub changed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentRequest {
    pub transaction_id: String,
    #[serde(alias = "val_id")]
    pub val_id: String,
    pub amount: Option<f64>,
}

/// Applies gateway callbacks and the member completion call to stored state.
pub struct ReconciliationService {
    donation_repo: Arc<dyn DonationRepository>,
    session_repo: Arc<dyn PaymentSessionRepository>,
    application_repo: Arc<dyn MemberApplicationRepository>,
    gateway: Arc<dyn PaymentGateway>,
    accounts: Arc<AccountService>,
    gateway_config: GatewayConfig,
}

impl ReconciliationService {
    pub fn new(
        donation_repo: Arc<dyn DonationRepository>,
        session_repo: Arc<dyn PaymentSessionRepository>,
        application_repo: Arc<dyn MemberApplicationRepository>,
        gateway: Arc<dyn PaymentGateway>,
        accounts: Arc<AccountService>,
        gateway_config: GatewayConfig,
    ) -> Self {
        Self {
            donation_repo,
            session_repo,
            application_repo,
            gateway,
            accounts,
            gateway_config,
        }
    }

    /// Cross-checks a success callback with the gateway before it may change state.
    async fn verify_success(&self, callback: &GatewayCallback, transaction_id: &str, expected_minor: i64) -> Result<()> {
        let val_id = callback
            .val_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::ValidationMismatch("Callback is missing val_id".to_string()))?;

        let validation = self.gateway.validate_transaction(val_id).await?;
        validation.ensure_matches(transaction_id, expected_minor, self.gateway_config.amount_tolerance)
    }

    pub async fn handle_donation_callback(
        &self,
        outcome: CallbackOutcome,
        callback: &GatewayCallback,
    ) -> Result<CallbackAck> {
        let transaction_id = callback
            .transaction_id()
            .ok_or_else(|| AppError::Validation("Missing tran_id".to_string()))?;

        let donation = self
            .donation_repo
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Donation callback '{}' for unknown transaction {}", outcome.as_str(), transaction_id);
                AppError::NotFound(format!("Donation not found with transaction ID: {}", transaction_id))
            })?;

        let target = PaymentFlow::Donation.target_status(outcome);
        let (from, to) = match plan_callback_transition(donation.status, target) {
            Transition::Apply { from, to } => (from, to),
            Transition::Duplicate(status) => {
                tracing::info!("Repeated '{}' callback for donation {}", outcome.as_str(), transaction_id);
                return Ok(CallbackAck {
                    transaction_id: transaction_id.to_string(),
                    status,
                    changed: false,
                });
            }
            Transition::Reject { current, attempted } => {
                tracing::warn!(
                    "Rejected donation transition {} -> {} for {}",
                    current,
                    attempted,
                    transaction_id
                );
                return Err(AppError::Conflict(format!(
                    "Donation {} is already {}",
                    transaction_id, current
                )));
            }
        };

        if outcome == CallbackOutcome::Success && self.gateway_config.verify_callbacks {
            self.verify_success(callback, transaction_id, donation.amount_minor).await?;
        }

        if !self.donation_repo.transition_status(transaction_id, from, to).await? {
            // Another delivery of the same callback got there first
            let current = self
                .donation_repo
                .find_by_transaction_id(transaction_id)
                .await?
                .map(|d| d.status)
                .unwrap_or(from);
            if current == to {
                return Ok(CallbackAck {
                    transaction_id: transaction_id.to_string(),
                    status: current,
                    changed: false,
                });
            }
            return Err(AppError::Conflict(format!(
                "Donation {} is already {}",
                transaction_id, current
            )));
        }

        tracing::info!("Donation {} moved {} -> {}", transaction_id, from, to);

        if to == PaymentStatus::Completed {
            if let Err(e) = self
                .accounts
                .ensure_account_for_contact(&donation.contact, donation.name.as_deref())
                .await
            {
                tracing::error!(
                    "Failed to provision account for donation {} ({}): {:?}",
                    transaction_id,
                    donation.contact,
                    e
                );
            }
        }

        Ok(CallbackAck {
            transaction_id: transaction_id.to_string(),
            status: to,
            changed: true,
        })
    }

    pub async fn handle_member_callback(
        &self,
        outcome: CallbackOutcome,
        callback: &GatewayCallback,
    ) -> Result<CallbackAck> {
        let transaction_id = callback
            .transaction_id()
            .ok_or_else(|| AppError::Validation("Missing tran_id".to_string()))?;

        let session = self
            .session_repo
            .find_active_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Member callback '{}' for unknown transaction {}", outcome.as_str(), transaction_id);
                AppError::NotFound(format!("Payment session not found with transaction ID: {}", transaction_id))
            })?;

        if outcome == CallbackOutcome::Success {
            return match callback.val_id.as_deref().filter(|v| !v.is_empty()) {
                Some(val_id) => {
                    let was_pending = session.status == PaymentStatus::Pending;
                    self.finalize_session(session, val_id).await?;
                    Ok(CallbackAck {
                        transaction_id: transaction_id.to_string(),
                        status: PaymentStatus::Completed,
                        changed: was_pending,
                    })
                }
                None if self.gateway_config.verify_callbacks => Err(AppError::ValidationMismatch(
                    "Callback is missing val_id".to_string(),
                )),
                None => {
                    // Completion arrives later through complete-payment
                    tracing::info!("Success callback without val_id for session {}", transaction_id);
                    Ok(CallbackAck {
                        transaction_id: transaction_id.to_string(),
                        status: session.status,
                        changed: false,
                    })
                }
            };
        }

        let target = PaymentFlow::Member.target_status(outcome);
        match plan_callback_transition(session.status, target) {
            Transition::Apply { from, to } => {
                if self.session_repo.transition_status(transaction_id, from, to, None).await? {
                    tracing::info!("Member payment session {} moved {} -> {}", transaction_id, from, to);
                    return Ok(CallbackAck {
                        transaction_id: transaction_id.to_string(),
                        status: to,
                        changed: true,
                    });
                }

                // Another delivery of the same callback got there first
                let current = self
                    .session_repo
                    .find_active_by_transaction_id(transaction_id)
                    .await?
                    .map(|s| s.status)
                    .unwrap_or(from);
                if current == to {
                    return Ok(CallbackAck {
                        transaction_id: transaction_id.to_string(),
                        status: current,
                        changed: false,
                    });
                }
                Err(AppError::Conflict(format!(
                    "Payment session {} is already {}",
                    transaction_id, current
                )))
            }
            Transition::Duplicate(status) => Ok(CallbackAck {
                transaction_id: transaction_id.to_string(),
                status,
                changed: false,
            }),
            Transition::Reject { current, attempted } => {
                tracing::warn!(
                    "Rejected payment session transition {} -> {} for {}",
                    current,
                    attempted,
                    transaction_id
                );
                Err(AppError::Conflict(format!(
                    "Payment session {} is already {}",
                    transaction_id, current
                )))
            }
        }
    }

    pub async fn complete_member_payment(&self, request: CompletePaymentRequest) -> Result<MemberApplication> {
        let transaction_id = request.transaction_id.trim();
        let val_id = request.val_id.trim();
        if transaction_id.is_empty() || val_id.is_empty() {
            return Err(AppError::Validation("transactionId and valId are required".to_string()));
        }

        let session = self
            .session_repo
            .find_active_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if let Some(amount) = request.amount {
            let claimed = to_minor_units(amount)
                .ok_or_else(|| AppError::Validation("Amount must be greater than 0".to_string()))?;
            let tolerance = self.gateway_config.amount_tolerance * MINOR_PER_MAJOR;
            if (claimed - session.form.amount_minor).abs() > tolerance {
                return Err(AppError::ValidationMismatch(
                    "Amount does not match the payment session".to_string(),
                ));
            }
        }

        self.finalize_session(session, val_id).await
    }

    /// Turns a pending session into a durable application, once.
    async fn finalize_session(&self, session: PaymentSession, val_id: &str) -> Result<MemberApplication> {
        let transaction_id = session.transaction_id.as_str();

        match session.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Completed => {
                return self
                    .application_repo
                    .find_by_transaction_id(transaction_id)
                    .await?
                    .ok_or_else(|| AppError::Conflict("Transaction already processed".to_string()));
            }
            other => {
                return Err(AppError::Conflict(format!(
                    "Payment session {} is {}",
                    transaction_id, other
                )));
            }
        }

        let validation = self.gateway.validate_transaction(val_id).await?;
        if let Err(e) = validation.ensure_matches(
            transaction_id,
            session.form.amount_minor,
            self.gateway_config.amount_tolerance,
        ) {
            tracing::warn!("Validation of {} failed: {}", transaction_id, e);
            return Err(e);
        }

        let created = self
            .application_repo
            .create(NewMemberApplication {
                transaction_id: Some(transaction_id.to_string()),
                form: session.form.clone(),
                payment_method: MemberPaymentMethod::Online,
                payment_document_url: None,
                payment_status: PaymentStatus::Completed,
                application_status: ApplicationStatus::PendingApproval,
                gateway_val_id: Some(val_id.to_string()),
                gateway_payload: Some(validation.raw.clone()),
            })
            .await;

        let application = match created {
            Ok(application) => application,
            Err(AppError::Conflict(_)) => {
                // A concurrent finaliser won the insert
                return self
                    .application_repo
                    .find_by_transaction_id(transaction_id)
                    .await?
                    .ok_or_else(|| AppError::Conflict("Transaction already processed".to_string()));
            }
            Err(e) => return Err(e),
        };

        if !self
            .session_repo
            .transition_status(
                transaction_id,
                PaymentStatus::Pending,
                PaymentStatus::Completed,
                Some(&validation.raw),
            )
            .await?
        {
            tracing::warn!("Payment session {} was no longer pending when completed", transaction_id);
        }

        tracing::info!(
            "Member application {} created from payment session {}",
            application.id,
            transaction_id
        );

        Ok(application)
    }
}
