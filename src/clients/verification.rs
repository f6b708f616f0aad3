use serde::Deserialize;
use tracing::debug;

use crate::config::VerificationConfig;
use crate::error::{Result, ShopError};

/// Provider answers are form-encoded, e.g. `code=0000&tx_id=9f2c&message=sent`.
/// Code `0000` means accepted; anything else is a rejection.
#[derive(Debug, Deserialize)]
struct OtpResponse {
    code: String,
    #[serde(default)]
    tx_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Phone identity verification provider. OTP state lives provider-side;
/// we only carry the transaction id between request and confirm.
pub struct VerificationClient {
    client: reqwest::Client,
    config: VerificationConfig,
}

impl VerificationClient {
    pub fn new(config: &VerificationConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    /// Starts an OTP challenge for the phone number; returns the provider
    /// transaction id to confirm against.
    pub async fn request_otp(&self, phone: &str) -> Result<String> {
        let url = format!("{}/otp/request", self.config.base_url.trim_end_matches('/'));
        let form = [
            ("client_code", self.config.client_code.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("phone", phone),
        ];
        let response = self.client.post(&url).form(&form).send().await?;
        let body = response.text().await?;
        parse_request_response(&body)
    }

    pub async fn confirm_otp(&self, tx_id: &str, otp: &str) -> Result<()> {
        let url = format!("{}/otp/confirm", self.config.base_url.trim_end_matches('/'));
        let form = [
            ("client_code", self.config.client_code.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("tx_id", tx_id),
            ("otp", otp),
        ];
        let response = self.client.post(&url).form(&form).send().await?;
        let body = response.text().await?;
        parse_confirm_response(&body)
    }
}

fn decode(body: &str) -> Result<OtpResponse> {
    let parsed: OtpResponse =
        serde_urlencoded::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)?;
    let code: i64 = parsed
        .code
        .parse()
        .map_err(|_| ShopError::ProviderResponseInvalid)?;
    if code != 0 {
        debug!(
            "Verification provider rejected the request: code={} message={:?}",
            parsed.code, parsed.message
        );
        return Err(ShopError::VerificationFailed);
    }
    Ok(parsed)
}

fn parse_request_response(body: &str) -> Result<String> {
    let parsed = decode(body)?;
    parsed.tx_id.ok_or(ShopError::ProviderResponseInvalid)
}

fn parse_confirm_response(body: &str) -> Result<()> {
    decode(body).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_request_yields_transaction_id() {
        let tx_id = parse_request_response("code=0000&tx_id=9f2c01&message=sent").unwrap();
        assert_eq!(tx_id, "9f2c01");
    }

    #[test]
    fn non_zero_code_is_verification_failed() {
        let err = parse_request_response("code=1004&message=blocked+number").unwrap_err();
        assert!(matches!(err, ShopError::VerificationFailed));
        let err = parse_confirm_response("code=1010&message=otp+mismatch").unwrap_err();
        assert!(matches!(err, ShopError::VerificationFailed));
    }

    #[test]
    fn accepted_request_without_tx_id_is_invalid() {
        let err = parse_request_response("code=0000&message=sent").unwrap_err();
        assert!(matches!(err, ShopError::ProviderResponseInvalid));
    }

    #[test]
    fn undecodable_body_is_invalid() {
        assert!(matches!(
            parse_confirm_response("code=abc").unwrap_err(),
            ShopError::ProviderResponseInvalid
        ));
        assert!(matches!(
            parse_confirm_response("%%%").unwrap_err(),
            ShopError::ProviderResponseInvalid
        ));
    }

    #[test]
    fn confirm_accepts_zero_code() {
        assert!(parse_confirm_response("code=0000").is_ok());
    }
}
