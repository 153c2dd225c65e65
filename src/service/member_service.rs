use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::MembersConfig,
    domain::*,
    error::{AppError, Result},
    notify::{NotificationService, StatusChange},
    repository::MemberApplicationRepository,
    service::PageMeta,
    web::uploads,
};

/// Uploaded proof of a bank payment.
#[derive(Debug, Clone)]
pub struct PaymentDocument {
    pub filename: String,
    pub data: Vec<u8>,
}

pub struct BankApplication {
    pub form: MemberFormRequest,
    pub payment_method: MemberPaymentMethod,
    pub transaction_id: Option<String>,
    pub document: Option<PaymentDocument>,
}

pub struct MemberService {
    repo: Arc<dyn MemberApplicationRepository>,
    notifications: Arc<NotificationService>,
    config: MembersConfig,
    uploads_dir: String,
}

impl MemberService {
    pub fn new(
        repo: Arc<dyn MemberApplicationRepository>,
        notifications: Arc<NotificationService>,
        config: MembersConfig,
        uploads_dir: String,
    ) -> Self {
        Self {
            repo,
            notifications,
            config,
            uploads_dir,
        }
    }

    pub async fn list(
        &self,
        filters: &MemberApplicationFilters,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<(Vec<MemberApplication>, PageMeta)> {
        let (page, limit) = PageMeta::normalize(page, limit);
        let total = self.repo.count(filters).await?;
        let items = self.repo.list(filters, limit, (page - 1) * limit).await?;
        Ok((items, PageMeta::new(page, limit, total)))
    }

    pub async fn get(&self, id: Uuid) -> Result<MemberApplication> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
    }

    /// Any status may follow any other. The applicant hears about it only
    /// when the value actually changes.
    pub async fn set_application_status(&self, id: Uuid, status: ApplicationStatus) -> Result<MemberApplication> {
        let current = self.get(id).await?;

        if status == ApplicationStatus::Approved
            && self.config.require_completed_payment_for_approval
            && current.payment_status != PaymentStatus::Completed
        {
            return Err(AppError::Conflict(
                "Cannot approve an application whose payment is not completed".to_string(),
            ));
        }

        if current.application_status == status {
            return Ok(current);
        }

        let updated = self.repo.update_application_status(id, status).await?;
        tracing::info!(
            "Member application {} status {} -> {}",
            id,
            current.application_status,
            status
        );

        self.notifications
            .send_status_change(&updated, StatusChange::Application(status))
            .await;

        Ok(updated)
    }

    pub async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<MemberApplication> {
        let current = self.get(id).await?;
        if current.payment_status == status {
            return Ok(current);
        }

        let updated = self.repo.update_payment_status(id, status).await?;
        tracing::info!(
            "Member application {} payment status {} -> {}",
            id,
            current.payment_status,
            status
        );

        self.notifications
            .send_status_change(&updated, StatusChange::Payment(status))
            .await;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let approved = || {
            AppError::Conflict("Cannot delete an approved member. Reject the application first.".to_string())
        };

        let application = self.get(id).await?;
        if application.application_status == ApplicationStatus::Approved {
            return Err(approved());
        }

        // An approval may land between the read and the delete
        if !self.repo.delete_unapproved(id).await? {
            return Err(approved());
        }

        if let Some(url) = application.payment_document_url.as_deref() {
            if let Err(e) = uploads::delete_payment_document(&self.uploads_dir, url).await {
                tracing::warn!("Failed to remove payment document {}: {:?}", url, e);
            }
        }

        tracing::info!("Deleted member application {}", id);
        Ok(())
    }

    /// Records a membership paid outside the gateway. The payment stays
    /// `pending_verification` until an operator checks the document.
    pub async fn submit_bank_application(&self, application: BankApplication) -> Result<MemberApplication> {
        let form = application.form.into_form_data()?;

        if application.payment_method == MemberPaymentMethod::Online {
            return Err(AppError::Validation(
                "Online payments must go through the payment gateway".to_string(),
            ));
        }

        let transaction_id = application
            .transaction_id
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if application.payment_method == MemberPaymentMethod::BankTransfer && transaction_id.is_none() {
            return Err(AppError::Validation(
                "Transaction ID is required for bank transfers".to_string(),
            ));
        }

        let document = application
            .document
            .ok_or_else(|| AppError::Validation("Payment document is required".to_string()))?;
        let document_url =
            uploads::save_payment_document(&self.uploads_dir, &document.filename, &document.data).await?;

        let created = self
            .repo
            .create(NewMemberApplication {
                transaction_id,
                form,
                payment_method: application.payment_method,
                payment_document_url: Some(document_url.clone()),
                payment_status: PaymentStatus::PendingVerification,
                application_status: ApplicationStatus::PendingApproval,
                gateway_val_id: None,
                gateway_payload: None,
            })
            .await;

        match created {
            Ok(application) => {
                tracing::info!(
                    "Member application {} submitted via {}",
                    application.id,
                    application.payment_method.as_str()
                );
                Ok(application)
            }
            Err(e) => {
                let _ = uploads::delete_payment_document(&self.uploads_dir, &document_url).await;
                Err(e)
            }
        }
    }
}
