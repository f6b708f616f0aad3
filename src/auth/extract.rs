use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::auth::Claims;
use crate::domain::Role;
use crate::error::ShopError;
use crate::server::AppState;

/// Verified session, taken by `/my` and `/member` handlers. Accepts a bearer
/// token or the session cookie.
pub struct AuthSession(pub Claims);

/// Session that additionally requires the admin role, taken by `/admin`
/// handlers.
pub struct AdminSession(pub Claims);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

pub(crate) fn cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    for pair in header.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == cookie_name {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ShopError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_value(&parts.headers, &state.config.auth.session_cookie))
            .ok_or(ShopError::Unauthorized)?;
        let claims = state.jwt.verify(&token)?;
        Ok(AuthSession(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ShopError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSession(claims) = AuthSession::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            return Err(ShopError::Forbidden);
        }
        Ok(AdminSession(claims))
    }
}
