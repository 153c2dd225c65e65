use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;

use crate::{
    domain::{payment::format_major, ApplicationStatus, MemberApplication, PaymentStatus},
    error::{AppError, Result},
};

pub mod smtp;

pub use smtp::SmtpNotifier;

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Stand-in used when no SMTP server is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tracing::info!("Email to {} not sent (no SMTP configured): {}", email.to, email.subject);
        Ok(())
    }
}

/// Best-effort delivery: failures are logged and never reach the caller.
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    org_name: String,
    currency: String,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, org_name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            notifier,
            org_name: org_name.into(),
            currency: currency.into(),
        }
    }

    pub async fn deliver(&self, email: OutgoingEmail) {
        match self.notifier.send(&email).await {
            Ok(_) => tracing::debug!(
                "Notifier {} delivered '{}' to {}",
                self.notifier.name(),
                email.subject,
                email.to
            ),
            Err(e) => tracing::error!(
                "Notifier {} failed to deliver '{}' to {}: {:?}",
                self.notifier.name(),
                email.subject,
                email.to,
                e
            ),
        }
    }

    pub async fn send_credentials(&self, to: &str, full_name: &str, password: &str) {
        match credentials_email(&self.org_name, to, full_name, password) {
            Ok(email) => self.deliver(email).await,
            Err(e) => tracing::error!("Failed to render credentials email for {}: {:?}", to, e),
        }
    }

    pub async fn send_status_change(&self, application: &MemberApplication, change: StatusChange) {
        let Some(to) = application.form.email.as_deref() else {
            tracing::debug!("Application {} has no email, skipping status notification", application.id);
            return;
        };

        match status_change_email(&self.org_name, &self.currency, to, application, change) {
            Ok(email) => self.deliver(email).await,
            Err(e) => tracing::error!(
                "Failed to render status email for application {}: {:?}",
                application.id,
                e
            ),
        }
    }
}

/// Which of the two independent statuses on an application changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Application(ApplicationStatus),
    Payment(PaymentStatus),
}

const GREEN: &str = "#4CAF50";
const AMBER: &str = "#FF9800";
const RED: &str = "#f44336";

impl StatusChange {
    fn kind_label(&self) -> &'static str {
        match self {
            StatusChange::Application(_) => "Application",
            StatusChange::Payment(_) => "Payment",
        }
    }

    fn status_label(&self) -> &'static str {
        match self {
            StatusChange::Application(status) => status.label(),
            StatusChange::Payment(status) => status.label(),
        }
    }

    /// Header colour, headline and follow-up line for the email.
    fn wording(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            StatusChange::Application(ApplicationStatus::Approved) => (
                GREEN,
                "Congratulations! Your membership application has been approved.",
                "We are delighted to welcome you as a member.",
            ),
            StatusChange::Application(ApplicationStatus::Rejected) => (
                RED,
                "Your membership application has been rejected.",
                "If you have any questions or concerns, please contact our support team.",
            ),
            StatusChange::Application(ApplicationStatus::PendingApproval) => (
                AMBER,
                "Your application is currently under review.",
                "We will notify you once the review process is complete.",
            ),
            StatusChange::Payment(PaymentStatus::Completed) => (
                GREEN,
                "Your payment has been successfully processed.",
                "Thank you for your payment. Your application is now being reviewed.",
            ),
            StatusChange::Payment(PaymentStatus::PendingVerification) => (
                AMBER,
                "Your payment is pending verification.",
                "We are reviewing your payment documents. You will be notified once verified.",
            ),
            StatusChange::Payment(PaymentStatus::Failed) => (
                RED,
                "Your payment could not be processed.",
                "Please contact our support team for assistance or try again.",
            ),
            StatusChange::Payment(PaymentStatus::Cancelled) => (
                RED,
                "Your payment has been cancelled.",
                "If this was unintentional, please contact our support team.",
            ),
            StatusChange::Payment(PaymentStatus::Pending) => (
                AMBER,
                "Your payment is pending.",
                "Please complete your payment to proceed with the application.",
            ),
        }
    }
}

#[derive(Template)]
#[template(path = "email/credentials.html")]
struct CredentialsHtml<'a> {
    org_name: &'a str,
    full_name: &'a str,
    login: &'a str,
    password: &'a str,
}

#[derive(Template)]
#[template(path = "email/credentials.txt")]
struct CredentialsText<'a> {
    org_name: &'a str,
    full_name: &'a str,
    login: &'a str,
    password: &'a str,
}

#[derive(Template)]
#[template(path = "email/status_change.html")]
struct StatusChangeHtml<'a> {
    org_name: &'a str,
    color: &'a str,
    kind_label: &'a str,
    applicant_name: &'a str,
    message: &'a str,
    status_label: &'a str,
    member_type_label: &'a str,
    amount: String,
    currency: &'a str,
    transaction_id: Option<String>,
    additional_info: &'a str,
}

#[derive(Template)]
#[template(path = "email/status_change.txt")]
struct StatusChangeText<'a> {
    org_name: &'a str,
    kind_label: &'a str,
    applicant_name: &'a str,
    message: &'a str,
    status_label: &'a str,
    member_type_label: &'a str,
    amount: String,
    currency: &'a str,
    transaction_id: Option<String>,
    additional_info: &'a str,
}

pub fn credentials_email(org_name: &str, to: &str, full_name: &str, password: &str) -> Result<OutgoingEmail> {
    let html_body = CredentialsHtml { org_name, full_name, login: to, password }
        .render()
        .map_err(|e| AppError::Email(e.to_string()))?;
    let text_body = CredentialsText { org_name, full_name, login: to, password }
        .render()
        .map_err(|e| AppError::Email(e.to_string()))?;

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("Welcome to {} - Your Account Credentials", org_name),
        html_body,
        text_body,
    })
}

pub fn status_change_email(
    org_name: &str,
    currency: &str,
    to: &str,
    application: &MemberApplication,
    change: StatusChange,
) -> Result<OutgoingEmail> {
    let (color, message, additional_info) = change.wording();
    let kind_label = change.kind_label();
    let status_label = change.status_label();
    let amount = format_major(application.form.amount_minor);

    let html_body = StatusChangeHtml {
        org_name,
        color,
        kind_label,
        applicant_name: &application.form.name,
        message,
        status_label,
        member_type_label: application.form.member_type.label(),
        amount: amount.clone(),
        currency,
        transaction_id: application.transaction_id.clone(),
        additional_info,
    }
    .render()
    .map_err(|e| AppError::Email(e.to_string()))?;

    let text_body = StatusChangeText {
        org_name,
        kind_label,
        applicant_name: &application.form.name,
        message,
        status_label,
        member_type_label: application.form.member_type.label(),
        amount,
        currency,
        transaction_id: application.transaction_id.clone(),
        additional_info,
    }
    .render()
    .map_err(|e| AppError::Email(e.to_string()))?;

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("{} - {} Status Update: {}", org_name, kind_label, status_label),
        html_body,
        text_body,
    })
}
