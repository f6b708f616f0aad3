use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{LoginLog, SocialProvider, User};
use crate::storage::Storage;

/// One authentication attempt, published for successes and failures alike.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub user_id: Option<Uuid>,
    pub username: String,
    pub provider: SocialProvider,
    pub remote_ip: Option<String>,
    pub user_agent: Option<String>,
    pub succeeded: bool,
    pub failure_reason: Option<String>,
}

impl LoginEvent {
    pub fn success(
        user: &User,
        provider: SocialProvider,
        remote_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            provider,
            remote_ip,
            user_agent,
            succeeded: true,
            failure_reason: None,
        }
    }

    pub fn failure(
        username: impl Into<String>,
        provider: SocialProvider,
        remote_ip: Option<String>,
        user_agent: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            user_id: None,
            username: username.into(),
            provider,
            remote_ip,
            user_agent,
            succeeded: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Publishing half of the login audit channel. Cloneable; the login flow
/// never waits on the writer.
#[derive(Clone)]
pub struct LoginEventBus {
    sender: mpsc::UnboundedSender<LoginEvent>,
}

impl LoginEventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LoginEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Fire and forget. An event published after the writer has exited is
    /// dropped silently.
    pub fn publish(&self, event: LoginEvent) {
        if self.sender.send(event).is_err() {
            debug!("Login event dropped, writer has exited");
        }
    }
}

/// Drains login events into storage. Each event gets exactly one write
/// attempt; a storage failure is logged and the loop moves on. The task
/// exits once every bus handle is dropped.
pub fn spawn_login_log_writer(
    storage: Arc<dyn Storage>,
    mut receiver: mpsc::UnboundedReceiver<LoginEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Login log writer started");
        while let Some(event) = receiver.recv().await {
            let mut log = LoginLog {
                id: None,
                user_id: event.user_id,
                username: event.username,
                provider: event.provider,
                remote_ip: event.remote_ip,
                user_agent: event.user_agent,
                succeeded: event.succeeded,
                failure_reason: event.failure_reason,
                created_at: Utc::now(),
            };
            if let Err(e) = storage.append_login_log(&mut log).await {
                warn!("Failed to persist login log for '{}': {}", log.username, e);
            }
        }
        info!("Login log writer stopped");
    })
}
