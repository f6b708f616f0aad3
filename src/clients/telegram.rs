use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::TelegramConfig;
use crate::error::{Result, ShopError};

/// Telegram keeps a JSON body on failures too, with the reason in
/// `description`.
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    /// Sends one message to the configured ops chat.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.base_url.trim_end_matches('/'),
            self.config.bot_token
        );
        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
        });
        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_send_response(status, &body)
    }
}

fn parse_send_response(status: StatusCode, body: &str) -> Result<()> {
    match serde_json::from_str::<SendMessageResponse>(body) {
        Ok(parsed) if parsed.ok => Ok(()),
        Ok(parsed) => Err(ShopError::TelegramSendFailed(
            parsed
                .description
                .unwrap_or_else(|| format!("HTTP {}", status)),
        )),
        Err(_) if !status.is_success() => {
            Err(ShopError::TelegramSendFailed(format!("HTTP {}", status)))
        }
        Err(_) => Err(ShopError::ProviderResponseInvalid),
    }
}
