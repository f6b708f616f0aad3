//! Application services. Each service owns one slice of the domain and
//! talks to storage and the outbound providers through the ports in
//! [`ports`].

pub mod auth_flow;
pub mod catalog;
pub mod notify;
pub mod orders;
pub mod ports;
pub mod support;
pub mod users;

pub use auth_flow::{AuthFlowService, CallbackOutcome, ClientMeta, LoginStart};
pub use catalog::CatalogService;
pub use notify::NotifyService;
pub use orders::OrderService;
pub use support::SupportService;
pub use users::UserService;

use crate::error::ShopError;

/// Counts an error against a provider, but only when the provider itself
/// misbehaved. A rejected OTP or captcha is the provider doing its job.
pub(crate) fn note_provider_error(provider: &str, e: &ShopError) {
    if matches!(
        e,
        ShopError::Http(_) | ShopError::ProviderResponseInvalid | ShopError::KeycloakAdminFailed
    ) {
        crate::metrics::provider::error(provider);
    }
}
