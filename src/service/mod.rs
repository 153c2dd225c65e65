pub mod account_service;
pub mod donation_service;
pub mod initiation_service;
pub mod member_service;
pub mod reconciliation_service;

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::gateway::PaymentGateway;
use crate::notify::{NotificationService, Notifier};
use crate::repository::*;
use account_service::AccountService;
use donation_service::DonationService;
use initiation_service::InitiationService;
use member_service::MemberService;
use reconciliation_service::ReconciliationService;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl PageMeta {
    /// Clamps raw query values: page is at least 1, limit is 1..=100.
    pub fn normalize(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }

    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = ((total_items + limit - 1) / limit).max(1);
        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
        }
    }
}

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub donation_repo: Arc<dyn DonationRepository>,
    pub application_repo: Arc<dyn MemberApplicationRepository>,
    pub session_repo: Arc<dyn PaymentSessionRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifications: Arc<NotificationService>,
    pub account_service: Arc<AccountService>,
    pub initiation_service: Arc<InitiationService>,
    pub reconciliation_service: Arc<ReconciliationService>,
    pub member_service: Arc<MemberService>,
    pub donation_service: Arc<DonationService>,
    pub auth_service: Arc<AuthService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        settings: Arc<Settings>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let donation_repo: Arc<dyn DonationRepository> =
            Arc::new(SqliteDonationRepository::new(db_pool.clone()));
        let application_repo: Arc<dyn MemberApplicationRepository> =
            Arc::new(SqliteMemberApplicationRepository::new(db_pool.clone()));
        let session_repo: Arc<dyn PaymentSessionRepository> =
            Arc::new(SqlitePaymentSessionRepository::new(db_pool.clone()));

        let notifications = Arc::new(NotificationService::new(
            notifier,
            settings.frontend.organization_name.clone(),
            settings.gateway.currency.clone(),
        ));

        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            user_repo.clone(),
            settings.auth.session_duration_hours,
        ));

        let account_service = Arc::new(AccountService::new(user_repo.clone(), notifications.clone()));

        let initiation_service = Arc::new(InitiationService::new(
            donation_repo.clone(),
            session_repo.clone(),
            gateway.clone(),
            settings.clone(),
        ));

        let reconciliation_service = Arc::new(ReconciliationService::new(
            donation_repo.clone(),
            session_repo.clone(),
            application_repo.clone(),
            gateway.clone(),
            account_service.clone(),
            settings.gateway.clone(),
        ));

        let member_service = Arc::new(MemberService::new(
            application_repo.clone(),
            notifications.clone(),
            settings.members.clone(),
            settings.uploads.dir.clone(),
        ));

        let donation_service = Arc::new(DonationService::new(donation_repo.clone()));

        Self {
            user_repo,
            donation_repo,
            application_repo,
            session_repo,
            gateway,
            notifications,
            account_service,
            initiation_service,
            reconciliation_service,
            member_service,
            donation_service,
            auth_service,
            db_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_normalization() {
        assert_eq!(PageMeta::normalize(None, None), (1, 10));
        assert_eq!(PageMeta::normalize(Some(0), Some(500)), (1, 100));
        assert_eq!(PageMeta::normalize(Some(3), Some(0)), (3, 1));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(PageMeta::new(1, 10, 0).total_pages, 1);
        assert_eq!(PageMeta::new(1, 10, 10).total_pages, 1);
        assert_eq!(PageMeta::new(2, 10, 11).total_pages, 2);
    }
}
