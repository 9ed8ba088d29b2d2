//! Outbound email. The auth service only sees the [`Mailer`] trait; failures
//! never cross the boundary as errors, only as a `false` delivery result.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info, warn};

use crate::config::EmailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether credentials are present. Checked by handlers up front so an
    /// unconfigured deployment fails loudly instead of half-issuing tokens.
    fn is_configured(&self) -> bool;

    /// The configured sender address, if any.
    fn sender(&self) -> Option<String>;

    /// Probe the SMTP connection (used by `/api/test-email`).
    async fn test_connection(&self) -> bool;

    /// Render and deliver the password-reset email. Returns delivery success.
    async fn send_password_reset(&self, to: &str, token: &str, name: &str) -> bool;
}

pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!("{frontend_url}/reset-password/{token}")
}

fn reset_email_body(frontend_url: &str, token: &str, name: &str) -> String {
    let link = reset_link(frontend_url, token);
    format!(
        "Hello {name},\n\
        \n\
        We received a request to reset the password for your Expensia account.\n\
        \n\
        Reset your password using the link below:\n\
        \n\
        {link}\n\
        \n\
        This link will expire in 1 hour for security reasons.\n\
        \n\
        If you didn't request this password reset, please ignore this email. \
        Your password will remain unchanged.\n\
        \n\
        This email was sent from Expensia. Please do not reply to this email.\n"
    )
}

/// SMTP-backed mailer (STARTTLS relay). Built once at startup from
/// [`EmailConfig`]; a config without credentials yields a mailer that reports
/// itself unconfigured and refuses to send.
pub struct SmtpMailer {
    config: EmailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig) -> anyhow::Result<Self> {
        let transport = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                info!(host = %config.smtp_host, user = %username, "configuring SMTP mailer");
                Some(
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                        .credentials(Credentials::new(username.clone(), password.clone()))
                        .port(config.smtp_port)
                        .build(),
                )
            }
            _ => {
                warn!("email credentials not configured; password reset emails disabled");
                None
            }
        };
        Ok(Self {
            config: config.clone(),
            transport,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    fn sender(&self) -> Option<String> {
        self.config.username.clone()
    }

    async fn test_connection(&self) -> bool {
        match &self.transport {
            Some(transport) => transport.test_connection().await.unwrap_or(false),
            None => false,
        }
    }

    async fn send_password_reset(&self, to: &str, token: &str, name: &str) -> bool {
        let (Some(transport), Some(username)) = (&self.transport, &self.config.username) else {
            return false;
        };

        let from = match format!("{} <{}>", self.config.from_name, username).parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                error!(error = %e, "invalid from address");
                return false;
            }
        };
        let to_mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                error!(error = %e, "invalid recipient address");
                return false;
            }
        };

        let email = match Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject("Password Reset Request - Expensia")
            .header(ContentType::TEXT_PLAIN)
            .body(reset_email_body(&self.config.frontend_url, token, name))
        {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "failed to build reset email");
                return false;
            }
        };

        match transport.send(email).await {
            Ok(_) => {
                info!("password reset email delivered");
                true
            }
            Err(e) => {
                error!(error = %e, "password reset email delivery failed");
                false
            }
        }
    }
}
