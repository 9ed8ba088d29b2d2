use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, User, UserStore};

/// In-memory user store with the same semantics as [`super::PgUserStore`].
/// Used by the test suite and local demos; not suitable for real deployments.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        let email = email.to_lowercase();
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash: password_hash.to_string(),
            reset_token: None,
            reset_token_expires: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().expect("user store lock poisoned");
        let email = email.to_lowercase();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().expect("user store lock poisoned");
        Ok(users
            .iter()
            .find(|u| {
                u.reset_token.as_deref() == Some(token)
                    && u.reset_token_expires.is_some_and(|expires| now < expires)
            })
            .cloned())
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.reset_token = Some(token.to_string());
        user.reset_token_expires = Some(expires_at);
        Ok(())
    }

    async fn clear_reset_token(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.reset_token = None;
        user.reset_token_expires = None;
        Ok(())
    }

    async fn update_password_and_clear_reset(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.reset_token = None;
        user.reset_token_expires = None;
        Ok(())
    }
}
