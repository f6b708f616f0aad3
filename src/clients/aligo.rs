use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::AligoConfig;
use crate::error::{Result, ShopError};

/// Gateway envelope. `result_code` arrives as a string or a number
/// depending on the endpoint revision.
#[derive(Debug, Deserialize)]
struct SendResponse {
    result_code: serde_json::Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    msg_id: Option<serde_json::Value>,
}

pub struct AligoClient {
    client: reqwest::Client,
    config: AligoConfig,
}

impl AligoClient {
    pub fn new(config: &AligoConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    /// Sends one SMS through the Aligo gateway.
    pub async fn send_sms(&self, receiver: &str, message: &str) -> Result<()> {
        let url = format!("{}/send/", self.config.base_url.trim_end_matches('/'));
        let form = [
            ("key", self.config.api_key.as_str()),
            ("user_id", self.config.user_id.as_str()),
            ("sender", self.config.sender.as_str()),
            ("receiver", receiver),
            ("msg", message),
        ];
        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let msg_id = parse_send_response(status, &body)?;
        debug!("Aligo accepted SMS: msg_id={:?}", msg_id);
        Ok(())
    }
}

/// Only `result_code == 1` means the gateway accepted the message.
fn parse_send_response(status: StatusCode, body: &str) -> Result<Option<String>> {
    if !status.is_success() {
        return Err(ShopError::SmsSendFailed(format!("HTTP {}", status)));
    }
    let parsed: SendResponse =
        serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)?;
    let accepted =
        parsed.result_code.as_i64() == Some(1) || parsed.result_code.as_str() == Some("1");
    if !accepted {
        return Err(ShopError::SmsSendFailed(parsed.message));
    }
    Ok(parsed.msg_id.map(|v| match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_send_yields_message_id() {
        let body = r#"{"result_code":"1","message":"success","msg_id":"411498"}"#;
        let msg_id = parse_send_response(StatusCode::OK, body).unwrap();
        assert_eq!(msg_id.as_deref(), Some("411498"));
    }

    #[test]
    fn numeric_result_code_is_accepted_too() {
        let body = r#"{"result_code":1,"message":"success","msg_id":411498}"#;
        assert!(parse_send_response(StatusCode::OK, body).is_ok());
    }

    #[test]
    fn gateway_rejection_keeps_its_message() {
        let body = r#"{"result_code":"-101","message":"invalid sender number"}"#;
        match parse_send_response(StatusCode::OK, body).unwrap_err() {
            ShopError::SmsSendFailed(message) => assert_eq!(message, "invalid sender number"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_body_is_provider_response_invalid() {
        let err = parse_send_response(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, ShopError::ProviderResponseInvalid));
    }
}
