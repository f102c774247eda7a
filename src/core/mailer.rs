use async_trait::async_trait;
use handlebars::Handlebars;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info, warn};
#[cfg(test)]
use mockall::automock;
use serde_json::json;
use std::sync::Arc;

use crate::config::SmtpConfig;
use crate::core::error::ServiceError;

const APP_NAME: &str = "MySE Portfolio";
const RESET_TEMPLATE: &str = "password_reset";

/// Outgoing email delivery
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an HTML message to a single recipient
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), ServiceError>;

    /// False when messages are only logged, never delivered
    fn delivers(&self) -> bool {
        true
    }
}

/// Delivers mail through an SMTP relay with STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| ServiceError::Internal(format!("invalid SMTP_FROM address: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ServiceError::Internal(format!("invalid SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.password.clone()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), ServiceError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| ServiceError::validation(format!("invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| ServiceError::Internal(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ServiceError::Internal(format!("failed to send email: {}", e)))?;

        info!("Email '{}' sent to {}", subject, to);
        Ok(())
    }
}

/// Development fallback used when SMTP credentials are missing
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_html(&self, to: &str, subject: &str, _html: &str) -> Result<(), ServiceError> {
        warn!("SMTP not configured; email '{}' to {} was not delivered", subject, to);
        Ok(())
    }

    fn delivers(&self) -> bool {
        false
    }
}

/// Pick the SMTP mailer when credentials are present, the logging one otherwise
pub fn build_mailer(config: &SmtpConfig) -> Result<Arc<dyn Mailer>, ServiceError> {
    if config.is_configured() {
        info!("Email delivery through {}:{}", config.host, config.port);
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        warn!("SMTP_USER/SMTP_PASSWORD not set, emails will only be logged");
        Ok(Arc::new(LogMailer))
    }
}

/// Shared handlebars instance for email bodies
lazy_static::lazy_static! {
    static ref HBS: Arc<Handlebars<'static>> = {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        if let Err(e) = hbs.register_template_string(RESET_TEMPLATE, include_str!("templates/password_reset.hbs")) {
            error!("Error registering email template {}: {}", RESET_TEMPLATE, e);
        }
        Arc::new(hbs)
    };
}

/// Render the password reset email body
pub fn render_password_reset(reset_link: &str, expires_minutes: i64) -> Result<String, ServiceError> {
    let context = json!({
        "app_name": APP_NAME,
        "reset_link": reset_link,
        "expires_minutes": expires_minutes,
    });

    HBS.render(RESET_TEMPLATE, &context)
        .map_err(|e| ServiceError::Internal(format!("failed to render email: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_contains_link_and_expiry() {
        let html = render_password_reset("http://localhost:3001/reset-password?token=abc123", 15).unwrap();
        assert!(html.contains("abc123"));
        assert!(html.contains("MySE Portfolio"));
        assert!(html.contains("15"));
    }

    #[test]
    fn test_unconfigured_smtp_uses_log_mailer() {
        let config = SmtpConfig::default();
        assert!(build_mailer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let mailer = LogMailer;
        assert!(mailer.send_html("a@b.com", "subject", "<p>x</p>").await.is_ok());
        assert!(!mailer.delivers());
    }
}
