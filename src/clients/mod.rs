//! Outbound provider clients. Each wraps one `reqwest::Client` built with
//! the provider's configured timeout; response decoding lives in pure
//! `parse_*` functions so it can be tested without a network.

pub mod aligo;
pub mod keycloak;
pub mod mailgun;
pub mod object_storage;
pub mod recaptcha;
pub mod slack;
pub mod smtp;
pub mod telegram;
pub mod verification;

pub use aligo::AligoClient;
pub use keycloak::{KeycloakClient, KeycloakUser, TokenSet};
pub use mailgun::MailgunClient;
pub use object_storage::{ObjectInfo, ObjectStorageClient, StorageHealth};
pub use recaptcha::RecaptchaClient;
pub use slack::SlackClient;
pub use smtp::SmtpMailer;
pub use telegram::TelegramClient;
pub use verification::VerificationClient;

use crate::error::Result;
use std::time::Duration;

pub(crate) fn http_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}
