use serde::Deserialize;
use tracing::debug;

use crate::config::RecaptchaConfig;
use crate::error::{Result, ShopError};

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct RecaptchaClient {
    client: reqwest::Client,
    config: RecaptchaConfig,
}

impl RecaptchaClient {
    pub fn new(config: &RecaptchaConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    /// Verifies a client captcha token. v3 responses carry a score and are
    /// rejected below the configured floor; v2 responses have no score.
    pub async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<()> {
        let mut form = vec![
            ("secret", self.config.secret.as_str()),
            ("response", token),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }
        let response = self
            .client
            .post(&self.config.verify_url)
            .form(&form)
            .send()
            .await?;
        let body = response.text().await?;
        parse_verify_response(&body, self.config.min_score)
    }
}

fn parse_verify_response(body: &str, min_score: f64) -> Result<()> {
    let parsed: VerifyResponse =
        serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)?;
    if !parsed.success {
        debug!("Captcha rejected: {:?}", parsed.error_codes);
        return Err(ShopError::RecaptchaRejected);
    }
    if let Some(score) = parsed.score {
        if score < min_score {
            debug!("Captcha score {} below floor {}", score, min_score);
            return Err(ShopError::RecaptchaRejected);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_score_is_accepted() {
        let body = r#"{"success":true,"score":0.9,"action":"question"}"#;
        assert!(parse_verify_response(body, 0.5).is_ok());
    }

    #[test]
    fn scoreless_success_is_accepted() {
        assert!(parse_verify_response(r#"{"success":true}"#, 0.5).is_ok());
    }

    #[test]
    fn failure_is_rejected() {
        let body = r#"{"success":false,"error-codes":["invalid-input-response"]}"#;
        assert!(matches!(
            parse_verify_response(body, 0.5).unwrap_err(),
            ShopError::RecaptchaRejected
        ));
    }

    #[test]
    fn low_score_is_rejected() {
        let body = r#"{"success":true,"score":0.1}"#;
        assert!(matches!(
            parse_verify_response(body, 0.5).unwrap_err(),
            ShopError::RecaptchaRejected
        ));
    }

    #[test]
    fn malformed_body_is_provider_response_invalid() {
        assert!(matches!(
            parse_verify_response("{", 0.5).unwrap_err(),
            ShopError::ProviderResponseInvalid
        ));
    }
}
