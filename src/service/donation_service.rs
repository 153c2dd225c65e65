use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::DonationRepository,
    service::PageMeta,
};

pub struct DonationPage {
    pub donations: Vec<Donation>,
    pub meta: PageMeta,
    pub total_amount_minor: i64,
}

pub struct DonationService {
    repo: Arc<dyn DonationRepository>,
}

impl DonationService {
    pub fn new(repo: Arc<dyn DonationRepository>) -> Self {
        Self { repo }
    }

    /// Admin listing. Only completed donations are shown; the total covers
    /// every match, not just the current page.
    pub async fn list_completed(
        &self,
        mut filters: DonationFilters,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<DonationPage> {
        filters.status = Some(PaymentStatus::Completed);
        if let Some(contact) = filters.contact.take() {
            filters.contact = Some(normalize_contact(&contact)).filter(|c| !c.is_empty());
        }

        let (page, limit) = PageMeta::normalize(page, limit);
        let total = self.repo.count(&filters).await?;
        let total_amount_minor = self.repo.total_amount(&filters).await?;
        let donations = self.repo.list(&filters, limit, (page - 1) * limit).await?;

        Ok(DonationPage {
            donations,
            meta: PageMeta::new(page, limit, total),
            total_amount_minor,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Donation> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Donation not found".to_string()))
    }

    pub async fn list_for_user(&self, user: &User) -> Result<Vec<Donation>> {
        let contacts = user.contacts();
        if contacts.is_empty() {
            return Ok(Vec::new());
        }
        self.repo.list_by_contacts(&contacts).await
    }
}
