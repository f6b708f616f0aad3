use std::sync::Arc;

use tracing::warn;

use crate::clients::{AligoClient, MailgunClient, SlackClient, SmtpMailer, TelegramClient};
use crate::config::AppConfig;
use crate::domain::{Order, Product, Profile, User, Voucher};
use crate::error::{Result, ShopError};
use crate::services::ports::{EmailSender, OpsNotifier, SmsSender};

/// Outbound notifications. Channels are enabled by config presence: ops
/// messages (Slack/Telegram) are best-effort, buyer-facing delivery
/// messages propagate failures to the caller.
pub struct NotifyService {
    ops: Vec<Arc<dyn OpsNotifier>>,
    sms: Option<Arc<dyn SmsSender>>,
    email_api: Option<Arc<dyn EmailSender>>,
    smtp: Option<Arc<dyn EmailSender>>,
}

impl NotifyService {
    pub fn new(
        ops: Vec<Arc<dyn OpsNotifier>>,
        sms: Option<Arc<dyn SmsSender>>,
        email_api: Option<Arc<dyn EmailSender>>,
        smtp: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        Self {
            ops,
            sms,
            email_api,
            smtp,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut ops: Vec<Arc<dyn OpsNotifier>> = Vec::new();
        if let Some(slack) = &config.slack {
            ops.push(Arc::new(SlackClient::new(slack)?));
        }
        if let Some(telegram) = &config.telegram {
            ops.push(Arc::new(TelegramClient::new(telegram)?));
        }
        let sms: Option<Arc<dyn SmsSender>> = match &config.aligo {
            Some(aligo) => Some(Arc::new(AligoClient::new(aligo)?)),
            None => None,
        };
        let email_api: Option<Arc<dyn EmailSender>> = match &config.mailgun {
            Some(mailgun) => Some(Arc::new(MailgunClient::new(mailgun)?)),
            None => None,
        };
        let smtp: Option<Arc<dyn EmailSender>> = match &config.smtp {
            Some(smtp) => Some(Arc::new(SmtpMailer::new(smtp)?)),
            None => None,
        };
        Ok(Self::new(ops, sms, email_api, smtp))
    }

    /// Tells every configured ops channel about a fresh order. Failures are
    /// logged and swallowed; an order never fails because Slack is down.
    pub async fn order_placed(&self, order: &Order, product: &Product) {
        if self.ops.is_empty() {
            return;
        }
        let text = format!(
            "New order {}: {} x {} ({} {})",
            order.order_no,
            order.quantity,
            product.name,
            order.total_amount,
            order.currency.code()
        );
        for notifier in &self.ops {
            match notifier.notify(&text).await {
                Ok(()) => crate::metrics::notify::sent(notifier.channel()),
                Err(e) => {
                    warn!("Order notification via {} failed: {}", notifier.channel(), e);
                    crate::metrics::notify::failed(notifier.channel());
                }
            }
        }
    }

    /// Sends the buyer their voucher codes over every reachable channel.
    /// Unlike ops messages these failures propagate, so a delivery that
    /// went nowhere is visible to the admin who triggered it.
    pub async fn deliver_vouchers(
        &self,
        user: &User,
        profile: Option<&Profile>,
        order: &Order,
        vouchers: &[Voucher],
    ) -> Result<()> {
        let codes: Vec<&str> = vouchers.iter().map(|v| v.code.as_str()).collect();
        let mut delivered = false;

        // Codes only go to a phone the buyer has proven they hold.
        let phone = profile
            .filter(|p| p.phone_verified)
            .and_then(|p| p.phone.as_deref());
        if let (Some(sms), Some(phone)) = (&self.sms, phone) {
            let text = format!(
                "[pinshop] Order {} voucher codes: {}",
                order.order_no,
                codes.join(", ")
            );
            match sms.send_sms(phone, &text).await {
                Ok(()) => {
                    crate::metrics::notify::sent("aligo");
                    delivered = true;
                }
                Err(e) => {
                    crate::metrics::notify::failed("aligo");
                    return Err(e);
                }
            }
        }

        if self.email_api.is_some() || self.smtp.is_some() {
            let subject = format!("Your pinshop order {}", order.order_no);
            let body = format!(
                "Voucher codes for order {}:\n\n{}\n\nThank you for your purchase.",
                order.order_no,
                codes.join("\n")
            );
            self.send_email_with_fallback(&user.email, &subject, &body)
                .await?;
            delivered = true;
        }

        if !delivered {
            warn!(
                "No delivery channel reached the buyer for order {}",
                order.order_no
            );
        }
        Ok(())
    }

    /// Mail API first, direct SMTP second. Errors only when every
    /// configured email path failed.
    pub async fn send_email_with_fallback(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        if let Some(api) = &self.email_api {
            match api.send_email(to, subject, body).await {
                Ok(()) => {
                    crate::metrics::notify::sent("mailgun");
                    return Ok(());
                }
                Err(e) => {
                    warn!("Mail API send failed: {}", e);
                    crate::metrics::notify::failed("mailgun");
                    if self.smtp.is_none() {
                        return Err(e);
                    }
                }
            }
        }
        if let Some(smtp) = &self.smtp {
            return match smtp.send_email(to, subject, body).await {
                Ok(()) => {
                    crate::metrics::notify::sent("smtp");
                    Ok(())
                }
                Err(e) => {
                    crate::metrics::notify::failed("smtp");
                    Err(e)
                }
            };
        }
        Err(ShopError::EmailSendFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    struct RecordingNotifier {
        name: &'static str,
        fail: bool,
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl OpsNotifier for RecordingNotifier {
        fn channel(&self) -> &'static str {
            self.name
        }

        async fn notify(&self, text: &str) -> Result<()> {
            if self.fail {
                return Err(ShopError::SlackSendFailed("down".into()));
            }
            self.messages.lock().await.push(text.to_string());
            Ok(())
        }
    }

    struct RecordingSms {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl SmsSender for RecordingSms {
        async fn send_sms(&self, receiver: &str, message: &str) -> Result<()> {
            self.sent
                .lock()
                .await
                .push((receiver.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct RecordingEmail {
        fail: bool,
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl EmailSender for RecordingEmail {
        async fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
            if self.fail {
                return Err(ShopError::EmailSendFailed);
            }
            self.sent
                .lock()
                .await
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    fn test_order() -> Order {
        Order {
            id: Some(Uuid::new_v4()),
            order_no: "20240601-ABCDEF".into(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 2,
            total_amount: Decimal::new(10000, 0),
            currency: crate::domain::Currency::KRW,
            status: crate::domain::OrderStatus::Paid,
            payment_method: crate::domain::PaymentMethod::Card,
            visibility: crate::domain::OrderVisibility::Visible,
            is_suspicious: false,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_product(order: &Order) -> Product {
        Product {
            id: Some(order.product_id),
            category_id: Uuid::new_v4(),
            name: "Game Card 5000".into(),
            slug: "game-card-5000".into(),
            description: None,
            face_value: Decimal::new(5000, 0),
            price: Decimal::new(5000, 0),
            currency: crate::domain::Currency::KRW,
            image_url: None,
            show_product: true,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_user() -> User {
        User {
            id: Some(Uuid::new_v4()),
            keycloak_id: "kc".into(),
            email: "buyer@example.com".into(),
            username: "buyer".into(),
            role: crate::domain::Role::Member,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn order_placed_swallows_channel_failures() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let service = NotifyService::new(
            vec![
                Arc::new(RecordingNotifier {
                    name: "slack",
                    fail: true,
                    messages: messages.clone(),
                }),
                Arc::new(RecordingNotifier {
                    name: "telegram",
                    fail: false,
                    messages: messages.clone(),
                }),
            ],
            None,
            None,
            None,
        );
        let order = test_order();
        let product = test_product(&order);

        service.order_placed(&order, &product).await;

        let messages = messages.lock().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("20240601-ABCDEF"));
        assert!(messages[0].contains("Game Card 5000"));
    }

    #[tokio::test]
    async fn email_falls_back_to_smtp_when_api_fails() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = NotifyService::new(
            Vec::new(),
            None,
            Some(Arc::new(RecordingEmail {
                fail: true,
                sent: sent.clone(),
            })),
            Some(Arc::new(RecordingEmail {
                fail: false,
                sent: sent.clone(),
            })),
        );

        service
            .send_email_with_fallback("a@example.com", "subject", "body")
            .await
            .unwrap();

        assert_eq!(sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn email_failure_propagates_when_every_path_fails() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = NotifyService::new(
            Vec::new(),
            None,
            Some(Arc::new(RecordingEmail {
                fail: true,
                sent: sent.clone(),
            })),
            None,
        );

        let err = service
            .send_email_with_fallback("a@example.com", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::EmailSendFailed));
    }

    fn test_profile(user: &User, phone_verified: bool) -> Profile {
        Profile {
            id: Some(Uuid::new_v4()),
            user_id: user.id.unwrap(),
            display_name: None,
            phone: Some("01012345678".into()),
            phone_verified,
            marketing_opt_in: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_voucher(order: &Order, code: &str) -> Voucher {
        Voucher {
            id: Some(Uuid::new_v4()),
            product_id: order.product_id,
            code: code.into(),
            status: crate::domain::VoucherStatus::Sold,
            order_id: order.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn vouchers_go_out_by_sms_to_a_verified_phone() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = NotifyService::new(
            Vec::new(),
            Some(Arc::new(RecordingSms { sent: sent.clone() })),
            None,
            None,
        );
        let order = test_order();
        let user = test_user();
        let profile = test_profile(&user, true);
        let vouchers = [test_voucher(&order, "GC-111"), test_voucher(&order, "GC-222")];

        service
            .deliver_vouchers(&user, Some(&profile), &order, &vouchers)
            .await
            .unwrap();

        let sent = sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "01012345678");
        assert!(sent[0].1.contains("GC-111, GC-222"));
    }

    #[tokio::test]
    async fn unverified_phone_never_receives_codes() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = NotifyService::new(
            Vec::new(),
            Some(Arc::new(RecordingSms { sent: sent.clone() })),
            None,
            None,
        );
        let order = test_order();
        let user = test_user();
        let profile = test_profile(&user, false);

        service
            .deliver_vouchers(&user, Some(&profile), &order, &[test_voucher(&order, "GC-1")])
            .await
            .unwrap();

        assert!(sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn delivery_without_any_channel_is_ok() {
        let service = NotifyService::new(Vec::new(), None, None, None);
        let order = test_order();
        let user = test_user();
        service
            .deliver_vouchers(&user, None, &order, &[])
            .await
            .unwrap();
    }
}
