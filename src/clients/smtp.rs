use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

use crate::config::SmtpConfig;
use crate::error::{Result, ShopError};

/// Direct SMTP delivery, used as the fallback when the mail API path is
/// unavailable or fails.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config.from.parse::<Mailbox>().map_err(|e| {
            ShopError::Config(format!("Invalid SMTP from address '{}': {}", config.from, e))
        })?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| ShopError::Config(format!("SMTP relay setup failed: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|_| ShopError::Validation(format!("invalid recipient address '{}'", to)))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|_| ShopError::SmtpSendFailed)?;
        self.transport.send(email).await.map_err(|e| {
            warn!("SMTP delivery failed: {}", e);
            ShopError::SmtpSendFailed
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from: "Pinshop <no-reply@example.com>".to_string(),
        }
    }

    #[tokio::test]
    async fn builds_from_valid_config() {
        assert!(SmtpMailer::new(&test_config()).is_ok());
    }

    #[test]
    fn invalid_from_address_is_a_config_error() {
        let mut config = test_config();
        config.from = "not an address".to_string();
        assert!(matches!(
            SmtpMailer::new(&config).unwrap_err(),
            ShopError::Config(_)
        ));
    }

    #[tokio::test]
    async fn invalid_recipient_fails_before_any_network() {
        let mailer = SmtpMailer::new(&test_config()).unwrap();
        let err = mailer.send("not an address", "hi", "body").await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }
}
