use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Role::Member),
            1 => Ok(Role::Admin),
            other => Err(ShopError::InvalidEnumValue {
                kind: "role",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            Role::Member => 0,
            Role::Admin => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocialProvider {
    Keycloak,
    Google,
    Kakao,
    Naver,
}

impl SocialProvider {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(SocialProvider::Keycloak),
            1 => Ok(SocialProvider::Google),
            2 => Ok(SocialProvider::Kakao),
            3 => Ok(SocialProvider::Naver),
            other => Err(ShopError::InvalidEnumValue {
                kind: "social provider",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            SocialProvider::Keycloak => 0,
            SocialProvider::Google => 1,
            SocialProvider::Kakao => 2,
            SocialProvider::Naver => 3,
        }
    }

    /// Identity-provider alias as Keycloak reports it in userinfo.
    pub fn from_idp_alias(alias: &str) -> Self {
        match alias.to_ascii_lowercase().as_str() {
            "google" => SocialProvider::Google,
            "kakao" => SocialProvider::Kakao,
            "naver" => SocialProvider::Naver,
            _ => SocialProvider::Keycloak,
        }
    }

    pub fn idp_alias(&self) -> &'static str {
        match self {
            SocialProvider::Keycloak => "keycloak",
            SocialProvider::Google => "google",
            SocialProvider::Kakao => "kakao",
            SocialProvider::Naver => "naver",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<Uuid>,
    pub keycloak_id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub marketing_opt_in: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialAccount {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub provider: SocialProvider,
    pub provider_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One authentication attempt, successful or not. `user_id` is unset when
/// the attempt never resolved to a local account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLog {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub provider: SocialProvider,
    pub remote_ip: Option<String>,
    pub user_agent: Option<String>,
    pub succeeded: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_values_round_trip() {
        assert_eq!(Role::from_value(0).unwrap(), Role::Member);
        assert_eq!(Role::from_value(1).unwrap(), Role::Admin);
        assert!(Role::from_value(2).is_err());
    }

    #[test]
    fn idp_alias_maps_known_providers() {
        assert_eq!(SocialProvider::from_idp_alias("google"), SocialProvider::Google);
        assert_eq!(SocialProvider::from_idp_alias("KAKAO"), SocialProvider::Kakao);
        assert_eq!(SocialProvider::from_idp_alias("naver"), SocialProvider::Naver);
        assert_eq!(SocialProvider::from_idp_alias(""), SocialProvider::Keycloak);
        assert_eq!(SocialProvider::from_idp_alias("github"), SocialProvider::Keycloak);
    }
}
