//! Credential store: persistence of user records and their pending
//! reset-token state.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence operations the auth service needs.
///
/// Every mutation is a single atomic row operation. The reset-token fields are
/// only ever written or cleared as a pair, which keeps the "both null or both
/// set" invariant regardless of backend.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. The email is stored lowercased; a case-insensitive
    /// duplicate fails with [`StoreError::DuplicateEmail`] even when two
    /// requests race, because the backend enforces uniqueness itself.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    /// Case-insensitive lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Find the user holding `token`, but only while `now` is before the
    /// stored expiry. Expired and unknown tokens both come back as `None`.
    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    async fn clear_reset_token(&self, user_id: Uuid) -> Result<(), StoreError>;

    /// Replace the password hash and clear the reset-token pair in one
    /// operation, so a consumed token can never be replayed.
    async fn update_password_and_clear_reset(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError>;
}
