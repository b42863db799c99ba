//! Persisted CRM entities and their creation payloads

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{Error, Result};

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A product record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// An order record.
///
/// `total_amount` is captured when the order is created and is not
/// recomputed if product prices change later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: u64,
    pub customer_id: u64,
    pub product_ids: Vec<u64>,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
}

/// Validated payload for inserting a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Validated payload for inserting a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// Validated payload for inserting an order.
///
/// `product_ids` is non-empty and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: u64,
    pub product_ids: Vec<u64>,
    pub order_date: DateTime<Utc>,
}

/// Sum of the given products' prices.
///
/// Fails instead of overflowing when the sum leaves the `Decimal` range.
pub fn order_total<'a>(products: impl IntoIterator<Item = &'a Product>) -> Result<Decimal> {
    products
        .into_iter()
        .try_fold(Decimal::ZERO, |total, p| total.checked_add(p.price))
        .ok_or_else(|| {
            Error::validation("productIds", "Order total exceeds the supported range.")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn product(id: u64, price: &str) -> Product {
        Product {
            id,
            name: format!("p{}", id),
            price: Decimal::from_str(price).unwrap(),
            stock: 1,
        }
    }

    #[test]
    fn test_order_total_is_exact() {
        let products = [product(1, "999.99"), product(2, "49.99")];
        assert_eq!(order_total(&products).unwrap().to_string(), "1049.98");
    }

    #[test]
    fn test_order_total_of_nothing_is_zero() {
        assert_eq!(order_total(&Vec::<Product>::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_order_total_out_of_range() {
        let max = Decimal::MAX.to_string();
        let products = [product(1, &max), product(2, &max)];
        let err = order_total(&products).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "productIds"));
    }
}
