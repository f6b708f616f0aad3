use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
    Canceled,
    Refunded,
}

impl OrderStatus {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Paid),
            2 => Ok(OrderStatus::Delivered),
            3 => Ok(OrderStatus::Canceled),
            4 => Ok(OrderStatus::Refunded),
            other => Err(ShopError::InvalidEnumValue {
                kind: "order status",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Delivered => 2,
            OrderStatus::Canceled => 3,
            OrderStatus::Refunded => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Point,
}

impl PaymentMethod {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(PaymentMethod::Card),
            1 => Ok(PaymentMethod::BankTransfer),
            2 => Ok(PaymentMethod::Point),
            other => Err(ShopError::InvalidEnumValue {
                kind: "payment method",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            PaymentMethod::Card => 0,
            PaymentMethod::BankTransfer => 1,
            PaymentMethod::Point => 2,
        }
    }
}

/// Whether the buyer can still see the order in their own listings. Hiding
/// is independent of status and never touches the admin view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderVisibility {
    Visible,
    Hidden,
}

impl OrderVisibility {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(OrderVisibility::Visible),
            1 => Ok(OrderVisibility::Hidden),
            other => Err(ShopError::InvalidEnumValue {
                kind: "order visibility",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            OrderVisibility::Visible => 0,
            OrderVisibility::Hidden => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<Uuid>,
    pub order_no: String,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub total_amount: Decimal,
    pub currency: Currency,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub visibility: OrderVisibility,
    pub is_suspicious: bool,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Three-way visibility filter for admin search. `All` means no filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisibilityFilter {
    #[default]
    All,
    VisibleOnly,
    HiddenOnly,
}

/// Admin order search. Every unset field matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchCriteria {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub suspicious: Option<bool>,
    #[serde(default)]
    pub removed: Option<bool>,
    #[serde(default)]
    pub visibility: VisibilityFilter,
}

impl OrderSearchCriteria {
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(method) = self.payment_method {
            if order.payment_method != method {
                return false;
            }
        }
        if let Some(currency) = self.currency {
            if order.currency != currency {
                return false;
            }
        }
        if let Some(suspicious) = self.suspicious {
            if order.is_suspicious != suspicious {
                return false;
            }
        }
        if let Some(removed) = self.removed {
            if order.is_removed != removed {
                return false;
            }
        }
        match self.visibility {
            VisibilityFilter::All => true,
            VisibilityFilter::VisibleOnly => order.visibility == OrderVisibility::Visible,
            VisibilityFilter::HiddenOnly => order.visibility == OrderVisibility::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            id: Some(Uuid::new_v4()),
            order_no: "20260821-A1B2C3".to_string(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 2,
            total_amount: Decimal::new(50000, 0),
            currency: Currency::KRW,
            status: OrderStatus::Paid,
            payment_method: PaymentMethod::Card,
            visibility: OrderVisibility::Visible,
            is_suspicious: false,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn order_status_rejects_out_of_range() {
        assert!(OrderStatus::from_value(4).is_ok());
        let err = OrderStatus::from_value(5).unwrap_err();
        assert!(matches!(
            err,
            ShopError::InvalidEnumValue { kind: "order status", value: 5 }
        ));
        assert!(OrderStatus::from_value(-1).is_err());
    }

    #[test]
    fn enum_values_round_trip() {
        for raw in 0..5 {
            assert_eq!(OrderStatus::from_value(raw).unwrap().value(), raw);
        }
        for raw in 0..3 {
            assert_eq!(PaymentMethod::from_value(raw).unwrap().value(), raw);
        }
        for raw in 0..2 {
            assert_eq!(OrderVisibility::from_value(raw).unwrap().value(), raw);
        }
    }

    #[test]
    fn empty_criteria_matches_everything() {
        let criteria = OrderSearchCriteria::default();
        let mut order = sample_order();
        assert!(criteria.matches(&order));
        order.is_removed = true;
        order.visibility = OrderVisibility::Hidden;
        assert!(criteria.matches(&order));
    }

    #[test]
    fn criteria_filter_by_status_and_method() {
        let criteria = OrderSearchCriteria {
            status: Some(OrderStatus::Paid),
            payment_method: Some(PaymentMethod::Card),
            ..Default::default()
        };
        let mut order = sample_order();
        assert!(criteria.matches(&order));
        order.status = OrderStatus::Pending;
        assert!(!criteria.matches(&order));
        order.status = OrderStatus::Paid;
        order.payment_method = PaymentMethod::Point;
        assert!(!criteria.matches(&order));
    }

    #[test]
    fn visibility_filter_partitions_orders() {
        let mut order = sample_order();
        let visible_only = OrderSearchCriteria {
            visibility: VisibilityFilter::VisibleOnly,
            ..Default::default()
        };
        let hidden_only = OrderSearchCriteria {
            visibility: VisibilityFilter::HiddenOnly,
            ..Default::default()
        };
        assert!(visible_only.matches(&order));
        assert!(!hidden_only.matches(&order));
        order.visibility = OrderVisibility::Hidden;
        assert!(!visible_only.matches(&order));
        assert!(hidden_only.matches(&order));
    }

    #[test]
    fn criteria_filter_by_flags() {
        let criteria = OrderSearchCriteria {
            suspicious: Some(true),
            removed: Some(false),
            ..Default::default()
        };
        let mut order = sample_order();
        assert!(!criteria.matches(&order));
        order.is_suspicious = true;
        assert!(criteria.matches(&order));
        order.is_removed = true;
        assert!(!criteria.matches(&order));
    }

    #[test]
    fn criteria_deserializes_with_missing_fields() {
        let criteria: OrderSearchCriteria = serde_json::from_str(r#"{"suspicious":true}"#).unwrap();
        assert_eq!(criteria.suspicious, Some(true));
        assert!(criteria.status.is_none());
        assert_eq!(criteria.visibility, VisibilityFilter::All);
    }
}
