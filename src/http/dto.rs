//! Request and response bodies for the JSON API. Request types validate
//! themselves before a handler touches the services; anything structural
//! (unknown enum values, wrong types) is already rejected by serde.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Currency, Order, OrderStatus, OrderVisibility, PaymentMethod, Product, QuestionStatus, Role,
    User, Voucher,
};
use crate::error::{Result, ShopError};

const MAX_NAME: usize = 100;
const MAX_SUBJECT: usize = 200;
const MAX_BODY: usize = 4000;
const MAX_TESTIMONIAL: usize = 2000;
const MAX_PHONE: usize = 32;

fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ShopError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(ShopError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

// Open surface

#[derive(Debug, Deserialize)]
pub struct SubmitQuestionRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub subject: String,
    pub body: String,
    pub captcha_token: String,
}

impl SubmitQuestionRequest {
    pub fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        max_len("name", &self.name, MAX_NAME)?;
        non_empty("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ShopError::Validation("email is not valid".into()));
        }
        if let Some(phone) = &self.phone {
            max_len("phone", phone, MAX_PHONE)?;
        }
        non_empty("subject", &self.subject)?;
        max_len("subject", &self.subject, MAX_SUBJECT)?;
        non_empty("body", &self.body)?;
        max_len("body", &self.body, MAX_BODY)?;
        non_empty("captcha_token", &self.captcha_token)
    }
}

// Member surface

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> Result<()> {
        if self.quantity < 1 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTestimonialRequest {
    pub author_name: String,
    pub body: String,
    pub rating: u8,
}

impl CreateTestimonialRequest {
    pub fn validate(&self) -> Result<()> {
        non_empty("author_name", &self.author_name)?;
        max_len("author_name", &self.author_name, MAX_NAME)?;
        non_empty("body", &self.body)?;
        max_len("body", &self.body, MAX_TESTIMONIAL)?;
        if !(1..=5).contains(&self.rating) {
            return Err(ShopError::Validation(
                "rating must be between 1 and 5".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub marketing_opt_in: bool,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(display_name) = &self.display_name {
            max_len("display_name", display_name, MAX_NAME)?;
        }
        if let Some(phone) = &self.phone {
            non_empty("phone", phone)?;
            max_len("phone", phone, MAX_PHONE)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct VerificationStartRequest {
    pub phone: String,
}

impl VerificationStartRequest {
    pub fn validate(&self) -> Result<()> {
        non_empty("phone", &self.phone)?;
        max_len("phone", &self.phone, MAX_PHONE)
    }
}

#[derive(Debug, Deserialize)]
pub struct VerificationConfirmRequest {
    pub phone: String,
    pub tx_id: String,
    pub otp: String,
}

impl VerificationConfirmRequest {
    pub fn validate(&self) -> Result<()> {
        non_empty("phone", &self.phone)?;
        max_len("phone", &self.phone, MAX_PHONE)?;
        non_empty("tx_id", &self.tx_id)?;
        non_empty("otp", &self.otp)
    }
}

// Auth surface

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Identity-provider alias to pre-select on the Keycloak login page.
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set instead of `code` when the provider refused the login.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Option<Uuid>,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Body returned by login callback and refresh. The same token also rides
/// the session cookie; the refresh token is for clients that do not keep
/// cookies.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserView,
    pub session_token: String,
    pub expires_in: i64,
    pub refresh_token: String,
}

// Admin surface

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryPayload {
    pub fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        max_len("name", &self.name, MAX_NAME)?;
        non_empty("slug", &self.slug)?;
        max_len("slug", &self.slug, MAX_NAME)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub face_value: Decimal,
    pub price: Decimal,
    pub currency: Currency,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_show_product")]
    pub show_product: bool,
}

fn default_show_product() -> bool {
    true
}

impl ProductPayload {
    pub fn validate(&self) -> Result<()> {
        non_empty("name", &self.name)?;
        max_len("name", &self.name, MAX_NAME)?;
        non_empty("slug", &self.slug)?;
        max_len("slug", &self.slug, MAX_NAME)?;
        if self.price <= Decimal::ZERO {
            return Err(ShopError::Validation("price must be positive".into()));
        }
        if self.face_value < Decimal::ZERO {
            return Err(ShopError::Validation(
                "face_value must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SetProductVisibilityRequest {
    pub show: bool,
}

#[derive(Debug, Deserialize)]
pub struct UploadVouchersRequest {
    pub codes: Vec<String>,
}

impl UploadVouchersRequest {
    pub fn validate(&self) -> Result<()> {
        if self.codes.is_empty() {
            return Err(ShopError::Validation("no voucher codes supplied".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct UploadVouchersResponse {
    pub added: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetOrderVisibilityRequest {
    pub visibility: OrderVisibility,
}

#[derive(Debug, Deserialize)]
pub struct SetSuspicionRequest {
    pub suspicious: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnswerQuestionRequest {
    pub answer: String,
}

impl AnswerQuestionRequest {
    pub fn validate(&self) -> Result<()> {
        non_empty("answer", &self.answer)?;
        max_len("answer", &self.answer, MAX_BODY)
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionListQuery {
    #[serde(default)]
    pub status: Option<QuestionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SetPublishedRequest {
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginLogQuery {
    #[serde(default = "default_login_log_limit")]
    pub limit: usize,
}

fn default_login_log_limit() -> usize {
    100
}

// Shared responses

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    pub available: u64,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub order: Order,
    pub vouchers: Vec<Voucher>,
}

#[derive(Debug, Serialize)]
pub struct VerificationStartResponse {
    pub tx_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_request_rejects_blank_and_oversized_fields() {
        let mut request = SubmitQuestionRequest {
            name: "Jin".into(),
            email: "jin@example.com".into(),
            phone: None,
            subject: "Voucher not received".into(),
            body: "I paid an hour ago.".into(),
            captcha_token: "tok".into(),
        };
        assert!(request.validate().is_ok());

        request.email = "not-an-email".into();
        assert!(matches!(
            request.validate().unwrap_err(),
            ShopError::Validation(_)
        ));

        request.email = "jin@example.com".into();
        request.body = "x".repeat(MAX_BODY + 1);
        assert!(request.validate().is_err());

        request.body = "ok".into();
        request.subject = "  ".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn order_request_requires_positive_quantity() {
        let request = PlaceOrderRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
            payment_method: PaymentMethod::Card,
        };
        assert!(matches!(
            request.validate().unwrap_err(),
            ShopError::Validation(_)
        ));
    }

    #[test]
    fn testimonial_request_bounds_the_rating() {
        let mut request = CreateTestimonialRequest {
            author_name: "Jin".into(),
            body: "Instant delivery.".into(),
            rating: 5,
        };
        assert!(request.validate().is_ok());
        request.rating = 6;
        assert!(request.validate().is_err());
        request.rating = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn product_payload_requires_positive_price() {
        let payload = ProductPayload {
            category_id: Uuid::new_v4(),
            name: "Gift Card 10k".into(),
            slug: "gift-card-10k".into(),
            description: None,
            face_value: Decimal::new(10_000, 0),
            price: Decimal::ZERO,
            currency: Currency::KRW,
            image_url: None,
            show_product: true,
        };
        assert!(matches!(
            payload.validate().unwrap_err(),
            ShopError::Validation(_)
        ));
    }
}
