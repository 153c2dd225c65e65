use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod donation_repository;
pub mod member_application_repository;
pub mod payment_session_repository;
pub mod user_repository;

pub use donation_repository::SqliteDonationRepository;
pub use member_application_repository::SqliteMemberApplicationRepository;
pub use payment_session_repository::SqlitePaymentSessionRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait DonationRepository: Send + Sync {
    async fn create(&self, donation: NewDonation) -> Result<Donation>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Donation>>;
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Donation>>;
    /// Moves the donation from `from` to `to` only if it is still in `from`.
    /// Returns false when another writer got there first.
    async fn transition_status(
        &self,
        transaction_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool>;
    async fn list(&self, filters: &DonationFilters, limit: i64, offset: i64) -> Result<Vec<Donation>>;
    async fn count(&self, filters: &DonationFilters) -> Result<i64>;
    async fn total_amount(&self, filters: &DonationFilters) -> Result<i64>;
    async fn list_by_contacts(&self, contacts: &[String]) -> Result<Vec<Donation>>;
}

#[async_trait]
pub trait MemberApplicationRepository: Send + Sync {
    /// Fails with `AppError::Conflict` if the transaction id is already taken.
    async fn create(&self, application: NewMemberApplication) -> Result<MemberApplication>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MemberApplication>>;
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<MemberApplication>>;
    async fn list(
        &self,
        filters: &MemberApplicationFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MemberApplication>>;
    async fn count(&self, filters: &MemberApplicationFilters) -> Result<i64>;
    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<MemberApplication>;
    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<MemberApplication>;
    /// Removes the application unless it is approved. Returns false when
    /// nothing was removed.
    async fn delete_unapproved(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait PaymentSessionRepository: Send + Sync {
    /// Inserts the session after clearing out expired ones.
    async fn create(&self, session: NewPaymentSession) -> Result<PaymentSession>;
    /// Only returns sessions that have not expired yet.
    async fn find_active_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentSession>>;
    async fn transition_status(
        &self,
        transaction_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        validation_payload: Option<&serde_json::Value>,
    ) -> Result<bool>;
    async fn purge_expired(&self) -> Result<u64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `AppError::Conflict` if the email or phone is already registered.
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Looks a user up by either email or phone.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;
    async fn password_hash_for(&self, id: Uuid) -> Result<Option<String>>;
}
