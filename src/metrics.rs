//! Metrics for the shop backend, exported in Prometheus format.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Order metrics
    OrdersPlaced,
    OrderAmount,
    VouchersAssigned,
    VouchersReleased,
    VouchersRevoked,

    // Auth metrics
    LoginSuccess,
    LoginFailure,
    TokenRefresh,

    // Notification metrics
    NotificationsSent,
    NotificationsFailed,

    // Provider metrics
    ProviderErrors,

    // Support metrics
    QuestionsReceived,
    QuestionsAnswered,
}

impl MetricName {
    /// Get the metric name as a string (convenience method)
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::OrdersPlaced => "pinshop_orders_placed_total",
            MetricName::OrderAmount => "pinshop_order_amount",
            MetricName::VouchersAssigned => "pinshop_vouchers_assigned_total",
            MetricName::VouchersReleased => "pinshop_vouchers_released_total",
            MetricName::VouchersRevoked => "pinshop_vouchers_revoked_total",
            MetricName::LoginSuccess => "pinshop_login_success_total",
            MetricName::LoginFailure => "pinshop_login_failure_total",
            MetricName::TokenRefresh => "pinshop_token_refresh_total",
            MetricName::NotificationsSent => "pinshop_notifications_sent_total",
            MetricName::NotificationsFailed => "pinshop_notifications_failed_total",
            MetricName::ProviderErrors => "pinshop_provider_errors_total",
            MetricName::QuestionsReceived => "pinshop_questions_received_total",
            MetricName::QuestionsAnswered => "pinshop_questions_answered_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call once at startup; tests
/// that never call it record into the no-op default recorder.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Render current metrics for the scrape endpoint.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub mod orders {
    use super::MetricName;

    pub fn placed() {
        ::metrics::counter!(MetricName::OrdersPlaced.as_str()).increment(1);
    }

    pub fn amount(amount: f64) {
        ::metrics::histogram!(MetricName::OrderAmount.as_str()).record(amount);
    }

    pub fn vouchers_assigned(count: u64) {
        ::metrics::counter!(MetricName::VouchersAssigned.as_str()).increment(count);
    }

    pub fn vouchers_released(count: u64) {
        ::metrics::counter!(MetricName::VouchersReleased.as_str()).increment(count);
    }

    pub fn vouchers_revoked(count: u64) {
        ::metrics::counter!(MetricName::VouchersRevoked.as_str()).increment(count);
    }
}

pub mod auth {
    use super::MetricName;

    pub fn login_success(provider: &str) {
        ::metrics::counter!(MetricName::LoginSuccess.as_str(), "provider" => provider.to_string())
            .increment(1);
    }

    pub fn login_failure(provider: &str) {
        ::metrics::counter!(MetricName::LoginFailure.as_str(), "provider" => provider.to_string())
            .increment(1);
    }

    pub fn token_refresh() {
        ::metrics::counter!(MetricName::TokenRefresh.as_str()).increment(1);
    }
}

pub mod notify {
    use super::MetricName;

    pub fn sent(channel: &str) {
        ::metrics::counter!(MetricName::NotificationsSent.as_str(), "channel" => channel.to_string())
            .increment(1);
    }

    pub fn failed(channel: &str) {
        ::metrics::counter!(MetricName::NotificationsFailed.as_str(), "channel" => channel.to_string())
            .increment(1);
    }
}

pub mod provider {
    use super::MetricName;

    pub fn error(provider: &str) {
        ::metrics::counter!(MetricName::ProviderErrors.as_str(), "provider" => provider.to_string())
            .increment(1);
    }
}

pub mod support {
    use super::MetricName;

    pub fn question_received() {
        ::metrics::counter!(MetricName::QuestionsReceived.as_str()).increment(1);
    }

    pub fn question_answered() {
        ::metrics::counter!(MetricName::QuestionsAnswered.as_str()).increment(1);
    }
}
