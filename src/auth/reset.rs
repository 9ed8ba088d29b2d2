use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};

/// How long a freshly issued reset token stays valid.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// An opaque, single-use password-reset secret.
///
/// Unlike a session token it carries no claims; validating it requires a
/// lookup against the stored token/expiry pair.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Generate a reset token: 32 cryptographically random bytes, hex-encoded,
/// expiring one hour from now.
pub fn issue_reset_token() -> ResetToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    ResetToken {
        token: hex::encode(bytes),
        expires_at: OffsetDateTime::now_utc() + RESET_TOKEN_TTL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_64_hex_chars() {
        let issued = issue_reset_token();
        assert_eq!(issued.token.len(), 64);
        assert!(issued.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(issue_reset_token().token, issue_reset_token().token);
    }

    #[test]
    fn expiry_is_one_hour_out() {
        let before = OffsetDateTime::now_utc();
        let issued = issue_reset_token();
        let after = OffsetDateTime::now_utc();
        assert!(issued.expires_at >= before + RESET_TOKEN_TTL);
        assert!(issued.expires_at <= after + RESET_TOKEN_TTL);
    }
}
