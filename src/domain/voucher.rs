use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a stocked voucher code. Purchased codes are sellable
/// inventory; Sold codes belong to exactly one order; Revoked codes are
/// burned by a refund and never return to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherStatus {
    Purchased,
    Sold,
    Revoked,
}

impl VoucherStatus {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(VoucherStatus::Purchased),
            1 => Ok(VoucherStatus::Sold),
            2 => Ok(VoucherStatus::Revoked),
            other => Err(ShopError::InvalidEnumValue {
                kind: "voucher status",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            VoucherStatus::Purchased => 0,
            VoucherStatus::Sold => 1,
            VoucherStatus::Revoked => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Option<Uuid>,
    pub product_id: Uuid,
    pub code: String,
    pub status: VoucherStatus,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn is_available(&self) -> bool {
        self.status == VoucherStatus::Purchased && self.order_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voucher_status_values() {
        for raw in 0..3 {
            assert_eq!(VoucherStatus::from_value(raw).unwrap().value(), raw);
        }
        assert!(matches!(
            VoucherStatus::from_value(3),
            Err(ShopError::InvalidEnumValue { kind: "voucher status", value: 3 })
        ));
    }

    #[test]
    fn availability_requires_purchased_and_unassigned() {
        let mut voucher = Voucher {
            id: Some(Uuid::new_v4()),
            product_id: Uuid::new_v4(),
            code: "PIN-0001".to_string(),
            status: VoucherStatus::Purchased,
            order_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(voucher.is_available());
        voucher.status = VoucherStatus::Sold;
        assert!(!voucher.is_available());
        voucher.status = VoucherStatus::Purchased;
        voucher.order_id = Some(Uuid::new_v4());
        assert!(!voucher.is_available());
    }
}
