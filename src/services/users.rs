use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::clients::KeycloakUser;
use crate::domain::{Profile, Role, SocialAccount, SocialProvider, User};
use crate::error::{Result, ShopError};
use crate::services::ports::IdentityVerifier;
use crate::storage::Storage;

pub struct UserService {
    storage: Arc<dyn Storage>,
    verifier: Arc<dyn IdentityVerifier>,
    admin_emails: Vec<String>,
}

impl UserService {
    pub fn new(
        storage: Arc<dyn Storage>,
        verifier: Arc<dyn IdentityVerifier>,
        admin_emails: Vec<String>,
    ) -> Self {
        let admin_emails = admin_emails
            .into_iter()
            .map(|e| e.to_ascii_lowercase())
            .collect();
        Self {
            storage,
            verifier,
            admin_emails,
        }
    }

    fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_ascii_lowercase();
        self.admin_emails.iter().any(|a| a == &email)
    }

    /// Finds or creates the local account for a Keycloak subject. First
    /// login creates user, profile and social link in one go; a known
    /// mailbox under a new subject adopts the new subject instead of
    /// erroring. Removed accounts cannot log back in.
    pub async fn provision_from_userinfo(&self, info: &KeycloakUser) -> Result<User> {
        if info.email.trim().is_empty() {
            return Err(ShopError::Validation(
                "identity provider returned no email".into(),
            ));
        }
        let provider =
            SocialProvider::from_idp_alias(info.identity_provider.as_deref().unwrap_or(""));
        let username = if info.preferred_username.is_empty() {
            info.email.clone()
        } else {
            info.preferred_username.clone()
        };

        let user = match self.storage.get_user_by_keycloak_id(&info.sub).await? {
            Some(mut existing) => {
                if existing.is_removed {
                    return Err(ShopError::Forbidden);
                }
                if existing.email != info.email || existing.username != username {
                    existing.email = info.email.clone();
                    existing.username = username.clone();
                    self.storage.update_user(&existing).await?;
                }
                existing
            }
            None => match self.storage.get_user_by_email(&info.email).await? {
                Some(mut linked) => {
                    if linked.is_removed {
                        return Err(ShopError::Forbidden);
                    }
                    // Same mailbox, fresh Keycloak subject: adopt it.
                    linked.keycloak_id = info.sub.clone();
                    linked.username = username.clone();
                    self.storage.update_user(&linked).await?;
                    linked
                }
                None => {
                    let role = if self.is_admin_email(&info.email) {
                        Role::Admin
                    } else {
                        Role::Member
                    };
                    let mut user = User {
                        id: None,
                        keycloak_id: info.sub.clone(),
                        email: info.email.clone(),
                        username: username.clone(),
                        role,
                        is_removed: false,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    };
                    self.storage.create_user(&mut user).await?;
                    let user_id = user.id.ok_or(ShopError::UserNotFound)?;
                    let mut profile = Profile {
                        id: None,
                        user_id,
                        display_name: Some(username.clone()),
                        phone: None,
                        phone_verified: false,
                        marketing_opt_in: false,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    };
                    self.storage.upsert_profile(&mut profile).await?;
                    info!("Provisioned user '{}' as {:?}", user.username, user.role);
                    user
                }
            },
        };

        let user_id = user.id.ok_or(ShopError::UserNotFound)?;
        let mut account = SocialAccount {
            id: None,
            user_id,
            provider,
            provider_user_id: info.sub.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.storage.link_social_account(&mut account).await?;
        Ok(user)
    }

    pub async fn by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<User>> {
        self.storage.get_user_by_keycloak_id(keycloak_id).await
    }

    /// Stored profile, or a blank one if the row is missing.
    pub async fn profile(&self, user_id: Uuid) -> Result<Profile> {
        Ok(self
            .storage
            .get_profile_by_user(user_id)
            .await?
            .unwrap_or_else(|| Profile {
                id: None,
                user_id,
                display_name: None,
                phone: None,
                phone_verified: false,
                marketing_opt_in: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
    }

    /// Changing the phone number drops its verified flag until the owner
    /// confirms the new number.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        phone: Option<String>,
        marketing_opt_in: bool,
    ) -> Result<Profile> {
        let mut profile = self.profile(user_id).await?;
        if profile.phone != phone {
            profile.phone_verified = false;
        }
        profile.display_name = display_name;
        profile.phone = phone;
        profile.marketing_opt_in = marketing_opt_in;
        self.storage.upsert_profile(&mut profile).await?;
        Ok(profile)
    }

    /// Starts an OTP challenge for the number; returns the transaction id
    /// the member must echo back on confirm.
    pub async fn request_phone_verification(&self, phone: &str) -> Result<String> {
        self.verifier.request_otp(phone).await.map_err(|e| {
            super::note_provider_error("verification", &e);
            e
        })
    }

    /// Confirms an OTP and pins the verified number to the profile.
    pub async fn confirm_phone_verification(
        &self,
        user_id: Uuid,
        phone: &str,
        tx_id: &str,
        otp: &str,
    ) -> Result<Profile> {
        self.verifier.confirm_otp(tx_id, otp).await.map_err(|e| {
            super::note_provider_error("verification", &e);
            e
        })?;
        let mut profile = self.profile(user_id).await?;
        profile.phone = Some(phone.to_string());
        profile.phone_verified = true;
        self.storage.upsert_profile(&mut profile).await?;
        Ok(profile)
    }

    // Admin surface

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.storage.list_users(true).await
    }

    pub async fn remove_user(&self, user_id: Uuid) -> Result<()> {
        self.storage.remove_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    struct StubVerifier {
        confirm_ok: bool,
    }

    #[async_trait]
    impl IdentityVerifier for StubVerifier {
        async fn request_otp(&self, _phone: &str) -> Result<String> {
            Ok("tx-1".to_string())
        }

        async fn confirm_otp(&self, _tx_id: &str, _otp: &str) -> Result<()> {
            if self.confirm_ok {
                Ok(())
            } else {
                Err(ShopError::VerificationFailed)
            }
        }
    }

    fn service_with(
        storage: Arc<MemoryStorage>,
        confirm_ok: bool,
        admin_emails: Vec<String>,
    ) -> UserService {
        UserService::new(storage, Arc::new(StubVerifier { confirm_ok }), admin_emails)
    }

    fn userinfo(sub: &str, email: &str, username: &str, idp: Option<&str>) -> KeycloakUser {
        KeycloakUser {
            sub: sub.into(),
            email: email.into(),
            preferred_username: username.into(),
            identity_provider: idp.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn first_login_creates_user_profile_and_social_link() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone(), true, vec!["Boss@example.com".into()]);

        let user = service
            .provision_from_userinfo(&userinfo("sub-1", "alice@example.com", "alice", Some("google")))
            .await
            .unwrap();

        assert_eq!(user.role, Role::Member);
        let user_id = user.id.unwrap();
        let profile = storage.get_profile_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("alice"));
        let accounts = storage.list_social_accounts(user_id).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].provider, SocialProvider::Google);
    }

    #[tokio::test]
    async fn admin_email_gets_the_admin_role() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage, true, vec!["Boss@example.com".into()]);

        let user = service
            .provision_from_userinfo(&userinfo("sub-2", "boss@Example.com", "boss", None))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn known_mailbox_under_new_subject_adopts_it() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone(), true, Vec::new());

        let first = service
            .provision_from_userinfo(&userinfo("sub-old", "bob@example.com", "bob", None))
            .await
            .unwrap();
        let second = service
            .provision_from_userinfo(&userinfo("sub-new", "bob@example.com", "bob", Some("kakao")))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.keycloak_id, "sub-new");
        assert_eq!(storage.list_users(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removed_account_cannot_log_back_in() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone(), true, Vec::new());

        let user = service
            .provision_from_userinfo(&userinfo("sub-3", "gone@example.com", "gone", None))
            .await
            .unwrap();
        storage.remove_user(user.id.unwrap()).await.unwrap();

        let err = service
            .provision_from_userinfo(&userinfo("sub-3", "gone@example.com", "gone", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Forbidden));
    }

    #[tokio::test]
    async fn missing_email_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage, true, Vec::new());
        let err = service
            .provision_from_userinfo(&userinfo("sub-4", "  ", "ghost", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn changing_phone_clears_the_verified_flag() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone(), true, Vec::new());
        let user = service
            .provision_from_userinfo(&userinfo("sub-5", "carol@example.com", "carol", None))
            .await
            .unwrap();
        let user_id = user.id.unwrap();

        let profile = service
            .confirm_phone_verification(user_id, "01012345678", "tx-1", "1234")
            .await
            .unwrap();
        assert!(profile.phone_verified);

        let profile = service
            .update_profile(user_id, Some("Carol".into()), Some("01099998888".into()), true)
            .await
            .unwrap();
        assert!(!profile.phone_verified);
        assert_eq!(profile.phone.as_deref(), Some("01099998888"));

        // Same number again keeps the flag untouched.
        let profile = service
            .update_profile(user_id, Some("Carol".into()), Some("01099998888".into()), false)
            .await
            .unwrap();
        assert!(!profile.phone_verified);
    }

    #[tokio::test]
    async fn failed_otp_leaves_the_profile_unverified() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone(), false, Vec::new());
        let user = service
            .provision_from_userinfo(&userinfo("sub-6", "dan@example.com", "dan", None))
            .await
            .unwrap();
        let user_id = user.id.unwrap();

        let err = service
            .confirm_phone_verification(user_id, "01012345678", "tx-1", "0000")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::VerificationFailed));
        let profile = service.profile(user_id).await.unwrap();
        assert!(!profile.phone_verified);
        assert!(profile.phone.is_none());
    }
}
