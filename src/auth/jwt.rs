use crate::domain::{Role, User};
use crate::error::{Result, ShopError};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "pinshop";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Local user id.
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// HS256 signing and verification keys for session tokens.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_minutes: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let user_id = user.id.ok_or_else(|| {
            ShopError::Validation("cannot issue a token for an unsaved user".to_string())
        })?;
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
            iss: ISSUER.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ShopError::Config(format!("failed to sign session token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ShopError::SessionExpired,
                _ => ShopError::Unauthorized,
            })
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(role: Role) -> User {
        User {
            id: Some(Uuid::new_v4()),
            keycloak_id: "kc-1".to_string(),
            email: "member@example.com".to_string(),
            username: "member".to_string(),
            role,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_verify_and_carry_the_role() {
        let keys = JwtKeys::new("secret", 60);
        let user = test_user(Role::Admin);
        let token = keys.issue(&user).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id.unwrap());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "pinshop");
    }

    #[test]
    fn expired_tokens_are_session_expired() {
        // Well past the default verification leeway
        let keys = JwtKeys::new("secret", -10);
        let token = keys.issue(&test_user(Role::Member)).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ShopError::SessionExpired));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let keys = JwtKeys::new("secret", 60);
        let other = JwtKeys::new("different", 60);
        let token = other.issue(&test_user(Role::Member)).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized));
    }

    #[test]
    fn unsaved_users_cannot_get_tokens() {
        let keys = JwtKeys::new("secret", 60);
        let mut user = test_user(Role::Member);
        user.id = None;
        assert!(keys.issue(&user).is_err());
    }
}
