use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::SlackConfig;
use crate::error::{Result, ShopError};

/// Slack reports API failures inside a 200 body.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackClient {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    /// Posts one line to the configured ops channel.
    pub async fn post_message(&self, text: &str) -> Result<()> {
        let url = format!(
            "{}/chat.postMessage",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = serde_json::json!({
            "channel": self.config.channel,
            "text": text,
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.bot_token)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_post_response(status, &body)
    }
}

fn parse_post_response(status: StatusCode, body: &str) -> Result<()> {
    if !status.is_success() {
        return Err(ShopError::SlackSendFailed(format!("HTTP {}", status)));
    }
    let parsed: PostMessageResponse =
        serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)?;
    if parsed.ok {
        Ok(())
    } else {
        Err(ShopError::SlackSendFailed(
            parsed.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}
