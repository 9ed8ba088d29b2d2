use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_days: i64,
}

/// SMTP credentials and addressing for the password-reset mailer.
///
/// The credentials are optional: the service starts without them, reports
/// itself as unconfigured via `/api/health`, and rejects forgot-password
/// requests with a 500 until both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    /// Base URL the reset link points at, e.g. `http://localhost:8080`.
    pub frontend_url: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "expensia".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "expensia-users".into()),
            session_ttl_days: std::env::var("JWT_SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let email = EmailConfig {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("EMAIL_USER").ok(),
            password: std::env::var("EMAIL_PASS").ok(),
            from_name: std::env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| "Expensia Support".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_email_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            username: None,
            password: None,
            from_name: "Expensia Support".into(),
            frontend_url: "http://localhost:8080".into(),
        }
    }

    #[test]
    fn email_config_requires_both_credentials() {
        let mut config = base_email_config();
        assert!(!config.is_configured());

        config.username = Some("support@example.com".into());
        assert!(!config.is_configured());

        config.password = Some("app-password".into());
        assert!(config.is_configured());
    }
}
