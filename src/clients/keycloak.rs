use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::KeycloakConfig;
use crate::domain::SocialProvider;
use crate::error::{Result, ShopError};

/// Tokens minted by the authorization-code or refresh grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Subject data from the userinfo endpoint. `identity_provider` is set by
/// a realm mapper when the session came through a brokered IdP.
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakUser {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub preferred_username: String,
    #[serde(default)]
    pub identity_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct KeycloakClient {
    client: reqwest::Client,
    config: KeycloakConfig,
}

impl KeycloakClient {
    pub fn new(config: &KeycloakConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            config: config.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.realm,
            name
        )
    }

    /// Authorization-code redirect target. A social `provider_hint`
    /// pre-selects that IdP on the Keycloak login screen.
    pub fn authorize_url(&self, state: &str, provider_hint: Option<SocialProvider>) -> String {
        let mut params = vec![
            ("response_type", "code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("scope", "openid email profile".to_string()),
            ("state", state.to_string()),
        ];
        if let Some(provider) = provider_hint {
            if provider != SocialProvider::Keycloak {
                params.push(("kc_idp_hint", provider.idp_alias().to_string()));
            }
        }
        let query = serde_urlencoded::to_string(&params).unwrap_or_default();
        format!("{}?{}", self.endpoint("auth"), query)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .client
            .post(self.endpoint("token"))
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_token_response(status, &body)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .client
            .post(self.endpoint("token"))
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_token_response(status, &body)
    }

    pub async fn userinfo(&self, access_token: &str) -> Result<KeycloakUser> {
        let response = self
            .client
            .get(self.endpoint("userinfo"))
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_userinfo_response(status, &body)
    }

    /// Revokes the refresh token's session server-side.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];
        let response = self
            .client
            .post(self.endpoint("logout"))
            .form(&form)
            .send()
            .await?;
        parse_admin_response(response.status())
    }
}

/// A well-formed Keycloak error envelope keeps its description for the
/// server log; everything else is an unreadable provider response.
fn auth_error(body: &str) -> ShopError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let detail = parsed.error_description.unwrap_or(parsed.error);
            debug!("Keycloak rejected the request: {}", detail);
            ShopError::KeycloakAuthFailed(detail)
        }
        Err(_) => ShopError::ProviderResponseInvalid,
    }
}

fn parse_token_response(status: StatusCode, body: &str) -> Result<TokenSet> {
    if !status.is_success() {
        return Err(auth_error(body));
    }
    serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)
}

fn parse_userinfo_response(status: StatusCode, body: &str) -> Result<KeycloakUser> {
    if !status.is_success() {
        return Err(auth_error(body));
    }
    serde_json::from_str(body).map_err(|_| ShopError::ProviderResponseInvalid)
}

fn parse_admin_response(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ShopError::KeycloakAdminFailed)
    }
}
