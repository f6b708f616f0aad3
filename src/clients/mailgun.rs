use reqwest::StatusCode;
use tracing::warn;

use crate::config::MailgunConfig;
use crate::error::{Result, ShopError};

pub struct MailgunClient {
    client: reqwest::Client,
    config: MailgunConfig,
}

impl MailgunClient {
    pub fn new(config: &MailgunConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    /// Sends a plain-text email through the Mailgun messages API.
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let url = format!(
            "{}/v3/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            self.config.domain
        );
        let form = [
            ("from", self.config.from.as_str()),
            ("to", to),
            ("subject", subject),
            ("text", body),
        ];
        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mailgun rejected the message ({}): {}", status, body);
        }
        parse_send_response(status)
    }
}

fn parse_send_response(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ShopError::EmailSendFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_2xx_is_email_send_failed() {
        assert!(parse_send_response(StatusCode::OK).is_ok());
        assert!(matches!(
            parse_send_response(StatusCode::UNAUTHORIZED).unwrap_err(),
            ShopError::EmailSendFailed
        ));
    }
}
