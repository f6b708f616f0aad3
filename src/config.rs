use crate::error::{Result, ShopError};
use serde::Deserialize;
use std::env;
use std::fs;

fn default_timeout() -> u64 {
    10
}

fn default_session_cookie() -> String {
    "pinshop_session".to_string()
}

fn default_token_ttl() -> i64 {
    60
}

fn default_local_path() -> String {
    "pinshop.db".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub keycloak: KeycloakConfig,
    pub recaptcha: RecaptchaConfig,
    pub verification: VerificationConfig,
    pub object_storage: ObjectStorageConfig,
    pub aligo: Option<AligoConfig>,
    pub mailgun: Option<MailgunConfig>,
    pub smtp: Option<SmtpConfig>,
    pub slack: Option<SlackConfig>,
    pub telegram: Option<TelegramConfig>,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Exact hosts and `*.` wildcard entries eligible for the cookie
    /// `Domain=` attribute.
    #[serde(default)]
    pub cookie_domains: Vec<String>,
    /// Accounts promoted to admin when provisioned.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AligoConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_id: String,
    pub sender: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailgunConfig {
    pub base_url: String,
    pub domain: String,
    pub api_key: String,
    pub from: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub base_url: String,
    pub bot_token: String,
    pub channel: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub base_url: String,
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub base_url: String,
    pub client_code: String,
    pub client_secret: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecaptchaConfig {
    pub verify_url: String,
    pub secret: String,
    pub min_score: f64,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStorageConfig {
    pub base_url: String,
    pub bucket: String,
    pub service_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Remote libsql URL; empty means a local file at `local_path`.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_local_path")]
    pub local_path: String,
}

impl AppConfig {
    /// Load configuration from `pinshop.toml` (or the path named by
    /// `PINSHOP_CONFIG`) and apply secret overrides from the environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("PINSHOP_CONFIG").unwrap_or_else(|_| "pinshop.toml".to_string());
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ShopError::Config(format!("Failed to read config file '{}': {}", config_path, e))
        })?;

        let mut config: AppConfig = toml::from_str(&config_content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = env::var("PINSHOP_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(secret) = env::var("KEYCLOAK_CLIENT_SECRET") {
            self.keycloak.client_secret = secret;
        }
        if let Ok(secret) = env::var("RECAPTCHA_SECRET") {
            self.recaptcha.secret = secret;
        }
        if let Ok(secret) = env::var("VERIFICATION_CLIENT_SECRET") {
            self.verification.client_secret = secret;
        }
        if let Ok(key) = env::var("OBJECT_STORAGE_SERVICE_KEY") {
            self.object_storage.service_key = key;
        }
        if let Some(aligo) = self.aligo.as_mut() {
            if let Ok(key) = env::var("ALIGO_API_KEY") {
                aligo.api_key = key;
            }
        }
        if let Some(mailgun) = self.mailgun.as_mut() {
            if let Ok(key) = env::var("MAILGUN_API_KEY") {
                mailgun.api_key = key;
            }
        }
        if let Some(smtp) = self.smtp.as_mut() {
            if let Ok(password) = env::var("SMTP_PASSWORD") {
                smtp.password = password;
            }
        }
        if let Some(slack) = self.slack.as_mut() {
            if let Ok(token) = env::var("SLACK_BOT_TOKEN") {
                slack.bot_token = token;
            }
        }
        if let Some(telegram) = self.telegram.as_mut() {
            if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
                telegram.bot_token = token;
            }
        }
        if let Ok(url) = env::var("LIBSQL_URL") {
            let db = self.database.get_or_insert_with(DatabaseConfig::default);
            db.url = url;
            if let Ok(token) = env::var("LIBSQL_AUTH_TOKEN") {
                db.auth_token = token;
            }
        }
    }
}
