//! Orchestration of registration, login and the password-reset flow.
//!
//! Handlers stay thin; everything testable lives here, against the
//! [`UserStore`] and [`Mailer`] traits.

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        reset::issue_reset_token,
    },
    error::ApiError,
    mailer::Mailer,
    store::{User, UserStore},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Shared register/login input validation; runs before any store access.
fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation(
            "Please enter a valid email format".into(),
        ));
    }
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }
    Ok(())
}

pub async fn register(
    store: &dyn UserStore,
    keys: &JwtKeys,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(String, User), ApiError> {
    validate_credentials(email, password)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }

    // Friendly pre-check; the unique index on lower(email) still decides races.
    if store.find_by_email(email).await?.is_some() {
        warn!(email = %email, "registration with existing email");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(password)?;
    let user = store.create_user(name, email, &hash).await?;
    let token = keys.sign_session(user.id, &user.email)?;

    info!(user_id = %user.id, "user registered");
    Ok((token, user))
}

pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<(String, User), ApiError> {
    validate_credentials(email, password)?;

    // Unknown email and wrong password collapse into one error so the
    // response does not reveal which accounts exist.
    let Some(user) = store.find_by_email(email).await? else {
        warn!("login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = keys.sign_session(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}

/// Forgot-password: issue a reset token, persist it, and email the link.
///
/// The set-token → send → rollback sequence is not serialized against a
/// concurrent reset using the fresh token; the window is tiny and tokens are
/// per-request high-entropy secrets, so a lost rollback only clears an
/// already-consumed token.
pub async fn request_password_reset(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    email: &str,
) -> Result<String, ApiError> {
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation(
            "Please enter a valid email format".into(),
        ));
    }
    if !mailer.is_configured() {
        return Err(ApiError::EmailNotConfigured);
    }

    let Some(user) = store.find_by_email(email).await? else {
        // Same 200 as the success path, so the response does not confirm
        // whether the account exists. The submitted address is echoed back.
        info!("password reset requested for unknown email");
        return Ok(format!(
            "If an account with {email} exists, password reset instructions have been sent."
        ));
    };

    let issued = issue_reset_token();
    store
        .set_reset_token(user.id, &issued.token, issued.expires_at)
        .await?;

    if !mailer
        .send_password_reset(&user.email, &issued.token, &user.name)
        .await
    {
        // Compensating action: a retry must issue a fresh token, never
        // resend this one. Best effort only; failure to clear is logged.
        if let Err(e) = store.clear_reset_token(user.id).await {
            warn!(user_id = %user.id, error = %e, "failed to roll back reset token");
        }
        return Err(ApiError::EmailSendFailed);
    }

    info!(user_id = %user.id, "password reset email sent");
    Ok(format!(
        "Password reset instructions have been sent to {email}. \
         Please check your inbox and spam folder."
    ))
}

pub async fn reset_password(
    store: &dyn UserStore,
    token: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    if new_password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let now = OffsetDateTime::now_utc();
    let Some(user) = store.find_by_valid_reset_token(token, now).await? else {
        warn!("password reset with invalid or expired token");
        return Err(ApiError::InvalidResetToken);
    };

    let hash = hash_password(new_password)?;
    store.update_password_and_clear_reset(user.id, &hash).await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::{config::JwtConfig, store::MemoryUserStore};

    struct MockMailer {
        configured: bool,
        deliver: bool,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl MockMailer {
        fn working() -> Self {
            Self {
                configured: true,
                deliver: true,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                deliver: false,
                ..Self::working()
            }
        }

        fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::working()
            }
        }

        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for MockMailer {
        fn is_configured(&self) -> bool {
            self.configured
        }

        fn sender(&self) -> Option<String> {
            self.configured.then(|| "support@example.com".to_string())
        }

        async fn test_connection(&self) -> bool {
            self.configured
        }

        async fn send_password_reset(&self, to: &str, token: &str, name: &str) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), token.to_string(), name.to_string()));
            self.deliver
        }
    }

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            session_ttl_days: 7,
        })
    }

    async fn register_ada(store: &MemoryUserStore) -> User {
        let (_, user) = register(store, &make_keys(), "Ada", "ada@example.com", "secret-1")
            .await
            .expect("registration succeeds");
        user
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_case_insensitively() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;

        let err = register(&store, &make_keys(), "Ada", "ADA@Example.com", "secret-2")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_store() {
        let store = MemoryUserStore::new();
        for (name, email, password) in [
            ("Ada", "", "secret-1"),
            ("Ada", "not-an-email", "secret-1"),
            ("Ada", "ada@example.com", "short"),
            ("   ", "ada@example.com", "secret-1"),
        ] {
            let err = register(&store, &make_keys(), name, email, password)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{name}/{email}");
        }
        assert!(store.find_by_email("ada@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let store = MemoryUserStore::new();
        let user = register_ada(&store).await;
        assert_ne!(user.password_hash, "secret-1");
        assert!(verify_password("secret-1", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn login_token_carries_user_identity() {
        let store = MemoryUserStore::new();
        let keys = make_keys();
        let registered = register_ada(&store).await;

        let (token, _) = login(&store, &keys, "ada@example.com", "secret-1")
            .await
            .expect("login succeeds");
        let claims = keys.verify(&token).expect("token decodes");
        assert_eq!(claims.sub, registered.id);
        assert_eq!(claims.email, "ada@example.com");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryUserStore::new();
        let keys = make_keys();
        register_ada(&store).await;

        let wrong_password = login(&store, &keys, "ada@example.com", "wrong-pass")
            .await
            .unwrap_err();
        let unknown_user = login(&store, &keys, "nobody@example.com", "secret-1")
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, ApiError::InvalidCredentials));
        assert!(matches!(unknown_user, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_generic_and_mutates_nothing() {
        let store = MemoryUserStore::new();
        let mailer = MockMailer::working();

        let message = request_password_reset(&store, &mailer, "ghost@example.com")
            .await
            .expect("generic success");
        assert!(message.contains("ghost@example.com"));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn forgot_password_requires_configured_mailer() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;
        let mailer = MockMailer::unconfigured();

        let err = request_password_reset(&store, &mailer, "ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailNotConfigured));
        let user = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(user.reset_token.is_none());
    }

    #[tokio::test]
    async fn forgot_password_persists_token_and_emails_it() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;
        let mailer = MockMailer::working();

        request_password_reset(&store, &mailer, "ada@example.com")
            .await
            .expect("reset requested");

        let user = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        let stored_token = user.reset_token.expect("token persisted");
        assert!(user.reset_token_expires.is_some());

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let (to, emailed_token, name) = &sent[0];
        assert_eq!(to, "ada@example.com");
        assert_eq!(emailed_token, &stored_token);
        assert_eq!(name, "Ada");
    }

    #[tokio::test]
    async fn forgot_password_rolls_back_token_when_delivery_fails() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;
        let mailer = MockMailer::failing();

        let err = request_password_reset(&store, &mailer, "ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailSendFailed));

        let user = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expires.is_none());
    }

    #[tokio::test]
    async fn retry_after_failed_delivery_issues_a_fresh_token() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;

        let failing = MockMailer::failing();
        let _ = request_password_reset(&store, &failing, "ada@example.com").await;
        let first_token = failing.sent()[0].1.clone();

        let working = MockMailer::working();
        request_password_reset(&store, &working, "ada@example.com")
            .await
            .expect("retry succeeds");
        assert_ne!(working.sent()[0].1, first_token);
    }

    #[tokio::test]
    async fn reset_password_replaces_hash_and_clears_token() {
        let store = MemoryUserStore::new();
        let before = register_ada(&store).await;
        let mailer = MockMailer::working();
        request_password_reset(&store, &mailer, "ada@example.com")
            .await
            .unwrap();
        let token = mailer.sent()[0].1.clone();

        reset_password(&store, &token, "new-secret")
            .await
            .expect("reset succeeds");

        let after = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_ne!(after.password_hash, before.password_hash);
        assert!(after.reset_token.is_none());
        assert!(after.reset_token_expires.is_none());
        assert!(verify_password("new-secret", &after.password_hash).unwrap());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;
        let mailer = MockMailer::working();
        request_password_reset(&store, &mailer, "ada@example.com")
            .await
            .unwrap();
        let token = mailer.sent()[0].1.clone();

        reset_password(&store, &token, "new-secret").await.unwrap();
        let err = reset_password(&store, &token, "another-secret")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResetToken));
    }

    #[tokio::test]
    async fn expired_token_fails_like_an_unknown_one() {
        let store = MemoryUserStore::new();
        let user = register_ada(&store).await;
        store
            .set_reset_token(
                user.id,
                "aged-token",
                OffsetDateTime::now_utc() - Duration::minutes(1),
            )
            .await
            .unwrap();

        let expired = reset_password(&store, "aged-token", "new-secret")
            .await
            .unwrap_err();
        let unknown = reset_password(&store, "never-issued", "new-secret")
            .await
            .unwrap_err();
        assert!(matches!(expired, ApiError::InvalidResetToken));
        assert!(matches!(unknown, ApiError::InvalidResetToken));
    }

    #[tokio::test]
    async fn weak_password_is_rejected_without_consuming_the_token() {
        let store = MemoryUserStore::new();
        register_ada(&store).await;
        let mailer = MockMailer::working();
        request_password_reset(&store, &mailer, "ada@example.com")
            .await
            .unwrap();
        let token = mailer.sent()[0].1.clone();

        let err = reset_password(&store, &token, "short").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // Token survives the failed attempt and still works.
        reset_password(&store, &token, "long-enough")
            .await
            .expect("token still valid");
    }

    #[test]
    fn email_pattern_accepts_and_rejects_the_obvious() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("user@nodot"));
    }
}
