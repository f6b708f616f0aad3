use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};

use crate::auth::JwtKeys;
use crate::clients::TokenSet;
use crate::domain::{SocialProvider, User};
use crate::error::{Result, ShopError};
use crate::events::{LoginEvent, LoginEventBus};
use crate::services::ports::AuthGateway;
use crate::services::users::UserService;

/// Where to send the browser, plus the state nonce the callback must echo.
#[derive(Debug, Clone)]
pub struct LoginStart {
    pub redirect_url: String,
    pub state: String,
}

/// Request metadata recorded in the login audit trail.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub remote_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A completed code exchange: the local account, a freshly issued session
/// token and the Keycloak tokens backing it.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub user: User,
    pub session_token: String,
    pub tokens: TokenSet,
}

/// Drives the authorization-code dance against Keycloak and turns its
/// subjects into local sessions. Every attempt, pass or fail, goes onto
/// the login event bus.
pub struct AuthFlowService {
    gateway: Arc<dyn AuthGateway>,
    users: Arc<UserService>,
    jwt: Arc<JwtKeys>,
    bus: LoginEventBus,
}

impl AuthFlowService {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        users: Arc<UserService>,
        jwt: Arc<JwtKeys>,
        bus: LoginEventBus,
    ) -> Self {
        Self {
            gateway,
            users,
            jwt,
            bus,
        }
    }

    /// Mints a state nonce and builds the authorization URL. The caller
    /// stashes the nonce in a cookie and checks it on the way back.
    pub fn login_start(&self, provider_hint: Option<SocialProvider>) -> LoginStart {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let redirect_url = self.gateway.authorize_url(&state, provider_hint);
        LoginStart {
            redirect_url,
            state,
        }
    }

    /// Completes the code exchange. The state echo must match the nonce
    /// stored at login start before any token leaves this process.
    pub async fn callback(
        &self,
        code: &str,
        state: &str,
        expected_state: Option<&str>,
        meta: &ClientMeta,
    ) -> Result<CallbackOutcome> {
        if expected_state != Some(state) {
            warn!("Login callback with mismatched state nonce");
            self.record_failure("unknown", SocialProvider::Keycloak, meta, "state mismatch");
            return Err(ShopError::Unauthorized);
        }

        let tokens = match self.gateway.exchange_code(code).await {
            Ok(tokens) => tokens,
            Err(e) => {
                super::note_provider_error("keycloak", &e);
                self.record_failure("unknown", SocialProvider::Keycloak, meta, e.to_string());
                return Err(e);
            }
        };

        let info = match self.gateway.userinfo(&tokens.access_token).await {
            Ok(info) => info,
            Err(e) => {
                super::note_provider_error("keycloak", &e);
                self.record_failure("unknown", SocialProvider::Keycloak, meta, e.to_string());
                return Err(e);
            }
        };

        let provider = info
            .identity_provider
            .as_deref()
            .map(SocialProvider::from_idp_alias)
            .unwrap_or(SocialProvider::Keycloak);

        let user = match self.users.provision_from_userinfo(&info).await {
            Ok(user) => user,
            Err(e) => {
                let username = if info.preferred_username.is_empty() {
                    info.email.as_str()
                } else {
                    info.preferred_username.as_str()
                };
                self.record_failure(username, provider, meta, e.to_string());
                return Err(e);
            }
        };

        let session_token = self.jwt.issue(&user)?;
        self.bus.publish(LoginEvent::success(
            &user,
            provider,
            meta.remote_ip.clone(),
            meta.user_agent.clone(),
        ));
        crate::metrics::auth::login_success(provider.idp_alias());
        info!(
            "User '{}' logged in via {}",
            user.username,
            provider.idp_alias()
        );
        Ok(CallbackOutcome {
            user,
            session_token,
            tokens,
        })
    }

    /// Trades a refresh token for fresh Keycloak tokens and a new session
    /// token. The subject must still map to a live local account.
    pub async fn refresh(&self, refresh_token: &str) -> Result<CallbackOutcome> {
        let tokens = match self.gateway.refresh(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                super::note_provider_error("keycloak", &e);
                return Err(e);
            }
        };
        let info = self.gateway.userinfo(&tokens.access_token).await?;
        let user = self
            .users
            .by_keycloak_id(&info.sub)
            .await?
            .filter(|u| !u.is_removed)
            .ok_or(ShopError::Unauthorized)?;
        let session_token = self.jwt.issue(&user)?;
        crate::metrics::auth::token_refresh();
        Ok(CallbackOutcome {
            user,
            session_token,
            tokens,
        })
    }

    /// Ends the Keycloak session. Best effort: the local cookies are gone
    /// either way, so a provider error is logged and dropped.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else {
            return;
        };
        if let Err(e) = self.gateway.logout(token).await {
            super::note_provider_error("keycloak", &e);
            warn!("Keycloak logout failed: {}", e);
        }
    }

    fn record_failure(
        &self,
        username: &str,
        provider: SocialProvider,
        meta: &ClientMeta,
        reason: impl Into<String>,
    ) {
        self.bus.publish(LoginEvent::failure(
            username,
            provider,
            meta.remote_ip.clone(),
            meta.user_agent.clone(),
            reason,
        ));
        crate::metrics::auth::login_failure(provider.idp_alias());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::KeycloakUser;
    use crate::events::spawn_login_log_writer;
    use crate::services::ports::IdentityVerifier;
    use crate::storage::{MemoryStorage, Storage};
    use async_trait::async_trait;

    struct StubVerifier;

    #[async_trait]
    impl IdentityVerifier for StubVerifier {
        async fn request_otp(&self, _phone: &str) -> Result<String> {
            Ok("tx-1".into())
        }

        async fn confirm_otp(&self, _tx_id: &str, _otp: &str) -> Result<()> {
            Ok(())
        }
    }

    struct StubGateway {
        fail_exchange: bool,
        userinfo: KeycloakUser,
    }

    impl StubGateway {
        fn passing() -> Self {
            Self {
                fail_exchange: false,
                userinfo: KeycloakUser {
                    sub: "kc-sub-1".into(),
                    email: "jin@example.com".into(),
                    preferred_username: "jin".into(),
                    identity_provider: Some("kakao".into()),
                },
            }
        }

        fn token_set() -> TokenSet {
            TokenSet {
                access_token: "at-1".into(),
                refresh_token: "rt-1".into(),
                expires_in: 300,
                id_token: None,
            }
        }
    }

    #[async_trait]
    impl AuthGateway for StubGateway {
        fn authorize_url(&self, state: &str, _provider_hint: Option<SocialProvider>) -> String {
            format!("https://idp.test/auth?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<TokenSet> {
            if self.fail_exchange {
                return Err(ShopError::KeycloakAuthFailed(
                    "invalid_grant: Code not valid".into(),
                ));
            }
            Ok(Self::token_set())
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
            if refresh_token == "expired" {
                return Err(ShopError::KeycloakAuthFailed(
                    "invalid_grant: Token is not active".into(),
                ));
            }
            Ok(Self::token_set())
        }

        async fn userinfo(&self, _access_token: &str) -> Result<KeycloakUser> {
            Ok(self.userinfo.clone())
        }

        async fn logout(&self, _refresh_token: &str) -> Result<()> {
            Err(ShopError::KeycloakAdminFailed)
        }
    }

    struct Harness {
        storage: Arc<MemoryStorage>,
        service: AuthFlowService,
        bus: LoginEventBus,
        writer: tokio::task::JoinHandle<()>,
    }

    fn harness(gateway: StubGateway) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let (bus, receiver) = LoginEventBus::new();
        let writer = spawn_login_log_writer(storage.clone(), receiver);
        let users = Arc::new(UserService::new(
            storage.clone(),
            Arc::new(StubVerifier),
            Vec::new(),
        ));
        let service = AuthFlowService::new(
            Arc::new(gateway),
            users,
            Arc::new(JwtKeys::new("test-secret", 30)),
            bus.clone(),
        );
        Harness {
            storage,
            service,
            bus,
            writer,
        }
    }

    async fn drain(h: Harness) -> Arc<MemoryStorage> {
        let Harness {
            storage,
            service,
            bus,
            writer,
        } = h;
        drop(service);
        drop(bus);
        writer.await.unwrap();
        storage
    }

    #[test]
    fn login_start_mints_distinct_nonces() {
        let (bus, _receiver) = LoginEventBus::new();
        let storage: Arc<MemoryStorage> = Arc::new(MemoryStorage::new());
        let users = Arc::new(UserService::new(
            storage,
            Arc::new(StubVerifier),
            Vec::new(),
        ));
        let service = AuthFlowService::new(
            Arc::new(StubGateway::passing()),
            users,
            Arc::new(JwtKeys::new("test-secret", 30)),
            bus,
        );

        let first = service.login_start(None);
        let second = service.login_start(Some(SocialProvider::Google));
        assert_eq!(first.state.len(), 32);
        assert_ne!(first.state, second.state);
        assert!(first.redirect_url.contains(&first.state));
    }

    #[tokio::test]
    async fn callback_provisions_user_and_issues_session() {
        let h = harness(StubGateway::passing());

        let outcome = h
            .service
            .callback("code-1", "nonce", Some("nonce"), &ClientMeta::default())
            .await
            .unwrap();
        assert_eq!(outcome.user.email, "jin@example.com");
        assert_eq!(outcome.tokens.refresh_token, "rt-1");
        let claims = JwtKeys::new("test-secret", 30)
            .verify(&outcome.session_token)
            .unwrap();
        assert_eq!(claims.sub, outcome.user.id.unwrap());

        let storage = drain(h).await;
        let logs = storage.list_recent_login_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].succeeded);
        assert_eq!(logs[0].provider, SocialProvider::Kakao);
        assert_eq!(logs[0].username, "jin");
    }

    #[tokio::test]
    async fn callback_rejects_state_mismatch_before_exchange() {
        let h = harness(StubGateway::passing());

        let meta = ClientMeta {
            remote_ip: Some("10.0.0.9".into()),
            user_agent: None,
        };
        let err = h
            .service
            .callback("code-1", "tampered", Some("nonce"), &meta)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized));

        let storage = drain(h).await;
        let logs = storage.list_recent_login_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].succeeded);
        assert_eq!(logs[0].failure_reason.as_deref(), Some("state mismatch"));
        assert_eq!(logs[0].remote_ip.as_deref(), Some("10.0.0.9"));
    }

    #[tokio::test]
    async fn callback_records_failed_exchange() {
        let mut gateway = StubGateway::passing();
        gateway.fail_exchange = true;
        let h = harness(gateway);

        let err = h
            .service
            .callback("bad-code", "nonce", Some("nonce"), &ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::KeycloakAuthFailed(_)));

        let storage = drain(h).await;
        let logs = storage.list_recent_login_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].succeeded);
    }

    #[tokio::test]
    async fn refresh_reissues_session_for_known_subject() {
        let h = harness(StubGateway::passing());

        h.service
            .callback("code-1", "nonce", Some("nonce"), &ClientMeta::default())
            .await
            .unwrap();
        let outcome = h.service.refresh("rt-1").await.unwrap();
        assert_eq!(outcome.user.email, "jin@example.com");
        assert!(!outcome.session_token.is_empty());
    }

    #[tokio::test]
    async fn refresh_rejects_unknown_subject() {
        let h = harness(StubGateway::passing());

        let err = h.service.refresh("rt-1").await.unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized));
    }

    #[tokio::test]
    async fn logout_swallows_provider_errors() {
        let h = harness(StubGateway::passing());

        h.service.logout(Some("rt-1")).await;
        h.service.logout(None).await;
    }
}
