use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    Order, OrderSearchCriteria, OrderStatus, OrderVisibility, PaymentMethod, Voucher,
};
use crate::error::{Result, ShopError};
use crate::services::notify::NotifyService;
use crate::storage::Storage;

pub struct OrderService {
    storage: Arc<dyn Storage>,
    notify: Arc<NotifyService>,
}

fn generate_order_no() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

impl OrderService {
    pub fn new(storage: Arc<dyn Storage>, notify: Arc<NotifyService>) -> Self {
        Self { storage, notify }
    }

    /// Places an order for a browsable product. Stock must cover the
    /// quantity up front; vouchers are only assigned when the order is
    /// marked paid.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: u32,
        payment_method: PaymentMethod,
    ) -> Result<Order> {
        if quantity == 0 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }
        let product = self
            .storage
            .get_product_by_id(product_id)
            .await?
            .filter(|p| p.is_browsable())
            .ok_or(ShopError::ProductNotFound)?;
        let available = self.storage.count_available_vouchers(product_id).await?;
        if available < quantity as u64 {
            return Err(ShopError::OutOfStock);
        }

        let total = product.price * Decimal::from(quantity);
        let mut order = Order {
            id: None,
            order_no: self.unique_order_no().await?,
            user_id,
            product_id,
            quantity,
            total_amount: total,
            currency: product.currency,
            status: OrderStatus::Pending,
            payment_method,
            visibility: OrderVisibility::Visible,
            is_suspicious: false,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.storage.create_order(&mut order).await?;
        info!(
            "Placed order {} for {} x {}",
            order.order_no, quantity, product.slug
        );
        crate::metrics::orders::placed();
        crate::metrics::orders::amount(total.to_f64().unwrap_or(0.0));

        self.notify.order_placed(&order, &product).await;
        Ok(order)
    }

    async fn unique_order_no(&self) -> Result<String> {
        let mut candidate = generate_order_no();
        for _ in 0..2 {
            if self.storage.get_order_by_no(&candidate).await?.is_none() {
                break;
            }
            candidate = generate_order_no();
        }
        Ok(candidate)
    }

    /// Orders the member sees: their own, not removed, not hidden.
    pub async fn my_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders = self.storage.list_orders_by_user(user_id).await?;
        orders.retain(|o| !o.is_removed && o.visibility == OrderVisibility::Visible);
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// One order by number, owner-checked. Another user's order number
    /// answers `OrderNotFound` so existence never leaks. Voucher codes
    /// ride along only once the order is paid or delivered.
    pub async fn order_detail(&self, user_id: Uuid, order_no: &str) -> Result<(Order, Vec<Voucher>)> {
        let order = self
            .storage
            .get_order_by_no(order_no)
            .await?
            .filter(|o| o.user_id == user_id && !o.is_removed)
            .ok_or(ShopError::OrderNotFound)?;
        let vouchers = match order.status {
            OrderStatus::Paid | OrderStatus::Delivered => {
                let order_id = order.id.ok_or(ShopError::OrderNotFound)?;
                self.storage.list_vouchers_by_order(order_id).await?
            }
            _ => Vec::new(),
        };
        Ok((order, vouchers))
    }

    // Admin surface

    pub async fn search(&self, criteria: &OrderSearchCriteria) -> Result<Vec<Order>> {
        let mut orders = self.storage.search_orders(criteria).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Drives the order through its lifecycle. Voucher effects happen
    /// before the status flips, so a failed assignment or delivery leaves
    /// the order where it was.
    pub async fn update_status(&self, order_id: Uuid, new_status: OrderStatus) -> Result<Order> {
        let order = self
            .storage
            .get_order_by_id(order_id)
            .await?
            .filter(|o| !o.is_removed)
            .ok_or(ShopError::OrderNotFound)?;

        match (order.status, new_status) {
            (OrderStatus::Pending, OrderStatus::Paid) => {
                let assigned = self
                    .storage
                    .assign_vouchers_to_order(order.product_id, order_id, order.quantity)
                    .await?;
                crate::metrics::orders::vouchers_assigned(assigned.len() as u64);
            }
            (OrderStatus::Paid, OrderStatus::Delivered) => {
                self.deliver(&order).await?;
            }
            (OrderStatus::Pending | OrderStatus::Paid, OrderStatus::Canceled) => {
                let released = self.storage.release_vouchers_for_order(order_id).await?;
                crate::metrics::orders::vouchers_released(released);
            }
            (OrderStatus::Paid | OrderStatus::Delivered, OrderStatus::Refunded) => {
                let revoked = self.storage.revoke_vouchers_for_order(order_id).await?;
                crate::metrics::orders::vouchers_revoked(revoked);
            }
            (from, to) => {
                return Err(ShopError::Validation(format!(
                    "order cannot move from {:?} to {:?}",
                    from, to
                )));
            }
        }

        self.storage.update_order_status(order_id, new_status).await?;
        info!(
            "Order {} moved {:?} -> {:?}",
            order.order_no, order.status, new_status
        );
        self.storage
            .get_order_by_id(order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)
    }

    async fn deliver(&self, order: &Order) -> Result<()> {
        let user = self
            .storage
            .get_user_by_id(order.user_id)
            .await?
            .ok_or(ShopError::UserNotFound)?;
        let profile = self.storage.get_profile_by_user(order.user_id).await?;
        let order_id = order.id.ok_or(ShopError::OrderNotFound)?;
        let vouchers = self.storage.list_vouchers_by_order(order_id).await?;
        self.notify
            .deliver_vouchers(&user, profile.as_ref(), order, &vouchers)
            .await
    }

    pub async fn set_visibility(
        &self,
        order_id: Uuid,
        visibility: OrderVisibility,
    ) -> Result<()> {
        self.storage.set_order_visibility(order_id, visibility).await
    }

    pub async fn set_suspicion(&self, order_id: Uuid, suspicious: bool) -> Result<()> {
        self.storage.set_order_suspicion(order_id, suspicious).await
    }

    pub async fn remove(&self, order_id: Uuid) -> Result<()> {
        self.storage.remove_order(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Product, Role, User};
    use crate::storage::MemoryStorage;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        service: OrderService,
        user_id: Uuid,
        product_id: Uuid,
    }

    async fn fixture(stock: usize) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let notify = Arc::new(NotifyService::new(Vec::new(), None, None, None));
        let service = OrderService::new(storage.clone(), notify);

        let mut category = Category {
            id: None,
            name: "Games".into(),
            slug: "games".into(),
            sort_order: 1,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        storage.create_category(&mut category).await.unwrap();

        let mut product = Product {
            id: None,
            category_id: category.id.unwrap(),
            name: "Game Card 5000".into(),
            slug: "gc-5000".into(),
            description: None,
            face_value: Decimal::new(5000, 0),
            price: Decimal::new(4800, 0),
            currency: crate::domain::Currency::KRW,
            image_url: None,
            show_product: true,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        storage.create_product(&mut product).await.unwrap();
        let product_id = product.id.unwrap();

        let codes: Vec<String> = (0..stock).map(|i| format!("CODE-{i:03}")).collect();
        if !codes.is_empty() {
            storage.add_vouchers(product_id, &codes).await.unwrap();
        }

        let mut user = User {
            id: None,
            keycloak_id: "kc-buyer".into(),
            email: "buyer@example.com".into(),
            username: "buyer".into(),
            role: Role::Member,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        storage.create_user(&mut user).await.unwrap();

        Fixture {
            storage,
            service,
            user_id: user.id.unwrap(),
            product_id,
        }
    }

    #[tokio::test]
    async fn placing_an_order_prices_it_from_the_product() {
        let f = fixture(3).await;
        let order = f
            .service
            .place_order(f.user_id, f.product_id, 2, PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(order.total_amount, Decimal::new(9600, 0));
        assert_eq!(order.status, OrderStatus::Pending);
        let date_prefix = Utc::now().format("%Y%m%d").to_string();
        assert!(order.order_no.starts_with(&date_prefix));
        // Nothing is assigned until payment.
        assert_eq!(
            f.storage.count_available_vouchers(f.product_id).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn insufficient_stock_rejects_placement() {
        let f = fixture(1).await;
        let err = f
            .service
            .place_order(f.user_id, f.product_id, 2, PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::OutOfStock));
    }

    #[tokio::test]
    async fn hidden_product_cannot_be_ordered() {
        let f = fixture(3).await;
        let mut product = f
            .storage
            .get_product_by_id(f.product_id)
            .await
            .unwrap()
            .unwrap();
        product.show_product = false;
        f.storage.update_product(&product).await.unwrap();

        let err = f
            .service
            .place_order(f.user_id, f.product_id, 1, PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound));
    }

    #[tokio::test]
    async fn paying_assigns_vouchers_and_detail_reveals_codes() {
        let f = fixture(3).await;
        let order = f
            .service
            .place_order(f.user_id, f.product_id, 2, PaymentMethod::Card)
            .await
            .unwrap();
        let order_id = order.id.unwrap();

        let (_, vouchers) = f.service.order_detail(f.user_id, &order.order_no).await.unwrap();
        assert!(vouchers.is_empty());

        let paid = f.service.update_status(order_id, OrderStatus::Paid).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(
            f.storage.count_available_vouchers(f.product_id).await.unwrap(),
            1
        );

        let (_, vouchers) = f.service.order_detail(f.user_id, &order.order_no).await.unwrap();
        assert_eq!(vouchers.len(), 2);
    }

    #[tokio::test]
    async fn canceling_returns_vouchers_to_stock() {
        let f = fixture(2).await;
        let order = f
            .service
            .place_order(f.user_id, f.product_id, 2, PaymentMethod::BankTransfer)
            .await
            .unwrap();
        let order_id = order.id.unwrap();
        f.service.update_status(order_id, OrderStatus::Paid).await.unwrap();
        assert_eq!(
            f.storage.count_available_vouchers(f.product_id).await.unwrap(),
            0
        );

        f.service
            .update_status(order_id, OrderStatus::Canceled)
            .await
            .unwrap();
        assert_eq!(
            f.storage.count_available_vouchers(f.product_id).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn refunding_revokes_without_restocking() {
        let f = fixture(2).await;
        let order = f
            .service
            .place_order(f.user_id, f.product_id, 2, PaymentMethod::Card)
            .await
            .unwrap();
        let order_id = order.id.unwrap();
        f.service.update_status(order_id, OrderStatus::Paid).await.unwrap();
        f.service
            .update_status(order_id, OrderStatus::Delivered)
            .await
            .unwrap();
        f.service
            .update_status(order_id, OrderStatus::Refunded)
            .await
            .unwrap();

        assert_eq!(
            f.storage.count_available_vouchers(f.product_id).await.unwrap(),
            0
        );
        let vouchers = f.storage.list_vouchers_by_order(order_id).await.unwrap();
        assert_eq!(vouchers.len(), 2);
        assert!(vouchers
            .iter()
            .all(|v| v.status == crate::domain::VoucherStatus::Revoked));
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected() {
        let f = fixture(2).await;
        let order = f
            .service
            .place_order(f.user_id, f.product_id, 1, PaymentMethod::Card)
            .await
            .unwrap();
        let err = f
            .service
            .update_status(order.id.unwrap(), OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn another_users_order_number_does_not_leak() {
        let f = fixture(2).await;
        let order = f
            .service
            .place_order(f.user_id, f.product_id, 1, PaymentMethod::Card)
            .await
            .unwrap();

        let err = f
            .service
            .order_detail(Uuid::new_v4(), &order.order_no)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::OrderNotFound));
    }

    #[tokio::test]
    async fn hidden_orders_stay_out_of_member_listing() {
        let f = fixture(3).await;
        let first = f
            .service
            .place_order(f.user_id, f.product_id, 1, PaymentMethod::Card)
            .await
            .unwrap();
        let second = f
            .service
            .place_order(f.user_id, f.product_id, 1, PaymentMethod::Card)
            .await
            .unwrap();
        f.service
            .set_visibility(first.id.unwrap(), OrderVisibility::Hidden)
            .await
            .unwrap();

        let mine = f.service.my_orders(f.user_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].order_no, second.order_no);

        // Detail still answers for a hidden order the member owns.
        assert!(f
            .service
            .order_detail(f.user_id, &first.order_no)
            .await
            .is_ok());
    }
}
