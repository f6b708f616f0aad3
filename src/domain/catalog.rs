use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currencies the shop sells in. Anything outside this set is rejected at
/// the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    KRW,
    USD,
    JPY,
    EUR,
}

impl Currency {
    pub fn from_code(code: &str) -> Result<Self> {
        match code.to_ascii_uppercase().as_str() {
            "KRW" => Ok(Currency::KRW),
            "USD" => Ok(Currency::USD),
            "JPY" => Ok(Currency::JPY),
            "EUR" => Ok(Currency::EUR),
            other => Err(ShopError::InvalidCurrency(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::KRW => "KRW",
            Currency::USD => "USD",
            Currency::JPY => "JPY",
            Currency::EUR => "EUR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable voucher product. `face_value` is what the code is worth,
/// `price` is what the buyer pays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<Uuid>,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub face_value: Decimal,
    pub price: Decimal,
    pub currency: Currency,
    pub image_url: Option<String>,
    pub show_product: bool,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product may appear on public surfaces.
    pub fn is_browsable(&self) -> bool {
        self.show_product && !self.is_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_round_trips_known_codes() {
        for code in ["KRW", "USD", "JPY", "EUR"] {
            let currency = Currency::from_code(code).unwrap();
            assert_eq!(currency.code(), code);
        }
        assert_eq!(Currency::from_code("usd").unwrap(), Currency::USD);
    }

    #[test]
    fn currency_rejects_unknown_codes() {
        let err = Currency::from_code("GBP").unwrap_err();
        assert!(matches!(err, ShopError::InvalidCurrency(code) if code == "GBP"));
    }
}
