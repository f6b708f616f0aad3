use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy for the whole service. Every domain failure carries a
/// fixed HTTP status and a stable code; transport failures fold in via
/// `#[from]` and surface as opaque upstream/internal errors.
#[derive(Error, Debug)]
pub enum ShopError {
    #[error("category not found")]
    CategoryNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("question not found")]
    QuestionNotFound,

    #[error("testimonial not found")]
    TestimonialNotFound,

    #[error("failed to save voucher codes: {0}")]
    VoucherSaveFailed(String),

    #[error("not enough voucher stock")]
    OutOfStock,

    #[error("no {kind} for value {value}")]
    InvalidEnumValue { kind: &'static str, value: i64 },

    #[error("unsupported currency code: {0}")]
    InvalidCurrency(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient role for this resource")]
    Forbidden,

    #[error("session expired")]
    SessionExpired,

    #[error("identity provider rejected the request: {0}")]
    KeycloakAuthFailed(String),

    #[error("identity provider admin call failed")]
    KeycloakAdminFailed,

    #[error("captcha verification failed")]
    RecaptchaRejected,

    #[error("phone verification failed")]
    VerificationFailed,

    #[error("SMS gateway rejected the message: {0}")]
    SmsSendFailed(String),

    #[error("mail API send failed")]
    EmailSendFailed,

    #[error("SMTP send failed")]
    SmtpSendFailed,

    #[error("Slack notification failed: {0}")]
    SlackSendFailed(String),

    #[error("Telegram notification failed: {0}")]
    TelegramSendFailed(String),

    #[error("provider returned an unreadable response")]
    ProviderResponseInvalid,

    #[error("object storage unavailable")]
    StorageUnavailable,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "db")]
    #[error("Database error: {message}")]
    Database { message: String },
}

pub type Result<T> = std::result::Result<T, ShopError>;

impl ShopError {
    /// HTTP status the global handler maps this error to.
    pub fn status(&self) -> StatusCode {
        match self {
            ShopError::CategoryNotFound
            | ShopError::ProductNotFound
            | ShopError::OrderNotFound
            | ShopError::UserNotFound
            | ShopError::QuestionNotFound
            | ShopError::TestimonialNotFound => StatusCode::NOT_FOUND,

            ShopError::OutOfStock => StatusCode::CONFLICT,

            ShopError::InvalidEnumValue { .. }
            | ShopError::InvalidCurrency(_)
            | ShopError::Validation(_)
            | ShopError::RecaptchaRejected
            | ShopError::VerificationFailed => StatusCode::BAD_REQUEST,

            ShopError::Unauthorized
            | ShopError::SessionExpired
            | ShopError::KeycloakAuthFailed(_) => StatusCode::UNAUTHORIZED,

            ShopError::Forbidden => StatusCode::FORBIDDEN,

            ShopError::KeycloakAdminFailed
            | ShopError::SmsSendFailed(_)
            | ShopError::EmailSendFailed
            | ShopError::SmtpSendFailed
            | ShopError::SlackSendFailed(_)
            | ShopError::TelegramSendFailed(_)
            | ShopError::ProviderResponseInvalid
            | ShopError::Http(_) => StatusCode::BAD_GATEWAY,

            ShopError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            ShopError::CategoryNotFound => "CATEGORY_NOT_FOUND",
            ShopError::ProductNotFound => "PRODUCT_NOT_FOUND",
            ShopError::OrderNotFound => "ORDER_NOT_FOUND",
            ShopError::UserNotFound => "USER_NOT_FOUND",
            ShopError::QuestionNotFound => "QUESTION_NOT_FOUND",
            ShopError::TestimonialNotFound => "TESTIMONIAL_NOT_FOUND",
            ShopError::VoucherSaveFailed(_) => "VOUCHER_SAVE_FAILED",
            ShopError::OutOfStock => "OUT_OF_STOCK",
            ShopError::InvalidEnumValue { .. } => "INVALID_ENUM_VALUE",
            ShopError::InvalidCurrency(_) => "INVALID_CURRENCY",
            ShopError::Validation(_) => "VALIDATION_FAILED",
            ShopError::Unauthorized => "UNAUTHORIZED",
            ShopError::Forbidden => "FORBIDDEN",
            ShopError::SessionExpired => "SESSION_EXPIRED",
            ShopError::KeycloakAuthFailed(_) => "KEYCLOAK_AUTH_FAILED",
            ShopError::KeycloakAdminFailed => "KEYCLOAK_ADMIN_FAILED",
            ShopError::RecaptchaRejected => "RECAPTCHA_REJECTED",
            ShopError::VerificationFailed => "VERIFICATION_FAILED",
            ShopError::SmsSendFailed(_) => "SMS_SEND_FAILED",
            ShopError::EmailSendFailed => "EMAIL_SEND_FAILED",
            ShopError::SmtpSendFailed => "SMTP_SEND_FAILED",
            ShopError::SlackSendFailed(_) => "SLACK_SEND_FAILED",
            ShopError::TelegramSendFailed(_) => "TELEGRAM_SEND_FAILED",
            ShopError::ProviderResponseInvalid => "PROVIDER_RESPONSE_INVALID",
            ShopError::StorageUnavailable => "OBJECT_STORAGE_UNAVAILABLE",
            ShopError::Http(_) => "UPSTREAM_REQUEST_FAILED",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message shown to API clients. Transport/internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ShopError::Http(_)
            | ShopError::Json(_)
            | ShopError::Toml(_)
            | ShopError::Io(_)
            | ShopError::Env(_)
            | ShopError::Config(_) => "internal error".to_string(),
            #[cfg(feature = "db")]
            ShopError::Database { .. } => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "request failed: {}", self);
        }
        let body = Json(serde_json::json!({
            "code": self.code(),
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_status() {
        assert_eq!(ShopError::OrderNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::OutOfStock.status(), StatusCode::CONFLICT);
        assert_eq!(ShopError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ShopError::KeycloakAuthFailed("invalid_grant".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ShopError::TelegramSendFailed("chat not found".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn transport_errors_hide_details() {
        let err = ShopError::Config("secret path".into());
        assert_eq!(err.public_message(), "internal error");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
