//! Seams between the service layer and the outbound providers, so services
//! can be exercised in tests without a network.

use async_trait::async_trait;

use crate::clients::{
    AligoClient, KeycloakClient, KeycloakUser, MailgunClient, RecaptchaClient, SlackClient,
    SmtpMailer, TelegramClient, TokenSet, VerificationClient,
};
use crate::domain::SocialProvider;
use crate::error::Result;

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<()>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, receiver: &str, message: &str) -> Result<()>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Ops-channel sink for order notifications. `channel` labels the metrics.
#[async_trait]
pub trait OpsNotifier: Send + Sync {
    fn channel(&self) -> &'static str;
    async fn notify(&self, text: &str) -> Result<()>;
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn request_otp(&self, phone: &str) -> Result<String>;
    async fn confirm_otp(&self, tx_id: &str, otp: &str) -> Result<()>;
}

/// The OIDC surface the login flow speaks. Matches the Keycloak client
/// one to one.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    fn authorize_url(&self, state: &str, provider_hint: Option<SocialProvider>) -> String;
    async fn exchange_code(&self, code: &str) -> Result<TokenSet>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;
    async fn userinfo(&self, access_token: &str) -> Result<KeycloakUser>;
    async fn logout(&self, refresh_token: &str) -> Result<()>;
}

#[async_trait]
impl CaptchaVerifier for RecaptchaClient {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<()> {
        RecaptchaClient::verify(self, token, remote_ip).await
    }
}

#[async_trait]
impl SmsSender for AligoClient {
    async fn send_sms(&self, receiver: &str, message: &str) -> Result<()> {
        AligoClient::send_sms(self, receiver, message).await
    }
}

#[async_trait]
impl EmailSender for MailgunClient {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        MailgunClient::send_email(self, to, subject, body).await
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.send(to, subject, body).await
    }
}

#[async_trait]
impl OpsNotifier for SlackClient {
    fn channel(&self) -> &'static str {
        "slack"
    }

    async fn notify(&self, text: &str) -> Result<()> {
        self.post_message(text).await
    }
}

#[async_trait]
impl OpsNotifier for TelegramClient {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, text: &str) -> Result<()> {
        self.send_message(text).await
    }
}

#[async_trait]
impl IdentityVerifier for VerificationClient {
    async fn request_otp(&self, phone: &str) -> Result<String> {
        VerificationClient::request_otp(self, phone).await
    }

    async fn confirm_otp(&self, tx_id: &str, otp: &str) -> Result<()> {
        VerificationClient::confirm_otp(self, tx_id, otp).await
    }
}

#[async_trait]
impl AuthGateway for KeycloakClient {
    fn authorize_url(&self, state: &str, provider_hint: Option<SocialProvider>) -> String {
        KeycloakClient::authorize_url(self, state, provider_hint)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        KeycloakClient::exchange_code(self, code).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        KeycloakClient::refresh(self, refresh_token).await
    }

    async fn userinfo(&self, access_token: &str) -> Result<KeycloakUser> {
        KeycloakClient::userinfo(self, access_token).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<()> {
        KeycloakClient::logout(self, refresh_token).await
    }
}
