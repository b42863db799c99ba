//! Declarative filters and sorting for list queries
//!
//! GraphQL filter inputs are lowered into a flat list of [`Predicate`]s
//! (`field`, `lookup`, `operand`). The store evaluates them against any
//! record implementing [`Filterable`]; nothing here knows how records are
//! stored.

use std::cmp::Ordering;

use async_graphql::{InputObject, ID};
use chrono::{DateTime as ChronoDateTime, Utc};
use rust_decimal::Decimal as RustDecimal;

use crate::model::{Customer, Product};
use crate::relay::{self, NodeKind};
use crate::types::{DateTime, Decimal};
use crate::{Error, Result};

/// Products with stock below this count as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

pub const CUSTOMER_SORT_FIELDS: &[&str] = &["id", "name", "email", "phone", "created_at"];
pub const PRODUCT_SORT_FIELDS: &[&str] = &["id", "name", "price", "stock"];
pub const ORDER_SORT_FIELDS: &[&str] = &["id", "total_amount", "order_date", "customer_name"];

/// Comparison applied between a record value and a predicate operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Case-insensitive substring
    IContains,
    /// Prefix match, or the field has no value at all
    StartsWithOrNull,
    Gte,
    Lte,
    Lt,
    Exact,
}

/// A typed value on either side of a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    Decimal(RustDecimal),
    Int(i64),
    DateTime(ChronoDateTime<Utc>),
    Id(u64),
}

impl Operand {
    /// Ordering between operands of the same kind; `None` across kinds.
    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
            (Operand::Decimal(a), Operand::Decimal(b)) => Some(a.cmp(b)),
            (Operand::Int(a), Operand::Int(b)) => Some(a.cmp(b)),
            (Operand::DateTime(a), Operand::DateTime(b)) => Some(a.cmp(b)),
            (Operand::Id(a), Operand::Id(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// One condition of a filter: `field <lookup> operand`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: &'static str,
    pub lookup: Lookup,
    pub operand: Operand,
}

impl Predicate {
    pub fn new(field: &'static str, lookup: Lookup, operand: Operand) -> Self {
        Self {
            field,
            lookup,
            operand,
        }
    }

    /// Test the predicate against every value a record holds for `field`.
    ///
    /// Multi-valued fields (an order's products) match when any value matches.
    pub fn matches(&self, values: &[Operand]) -> bool {
        if self.lookup == Lookup::StartsWithOrNull && values.is_empty() {
            return true;
        }
        values.iter().any(|value| self.matches_value(value))
    }

    fn matches_value(&self, value: &Operand) -> bool {
        match self.lookup {
            Lookup::IContains => match (value, &self.operand) {
                (Operand::Text(v), Operand::Text(needle)) => {
                    v.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            Lookup::StartsWithOrNull => match (value, &self.operand) {
                (Operand::Text(v), Operand::Text(prefix)) => v.starts_with(prefix.as_str()),
                _ => false,
            },
            Lookup::Gte => matches!(
                value.compare(&self.operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Lookup::Lte => matches!(
                value.compare(&self.operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Lookup::Lt => value.compare(&self.operand) == Some(Ordering::Less),
            Lookup::Exact => value.compare(&self.operand) == Some(Ordering::Equal),
        }
    }
}

/// A record whose fields can be read by name for filtering and sorting
pub trait Filterable {
    /// All values of `field`; empty when the field is unset or unknown.
    fn values(&self, field: &str) -> Vec<Operand>;
}

impl Filterable for Customer {
    fn values(&self, field: &str) -> Vec<Operand> {
        match field {
            "id" => vec![Operand::Id(self.id)],
            "name" => vec![Operand::Text(self.name.clone())],
            "email" => vec![Operand::Text(self.email.clone())],
            "phone" => self.phone.iter().cloned().map(Operand::Text).collect(),
            "created_at" => vec![Operand::DateTime(self.created_at)],
            _ => Vec::new(),
        }
    }
}

impl Filterable for Product {
    fn values(&self, field: &str) -> Vec<Operand> {
        match field {
            "id" => vec![Operand::Id(self.id)],
            "name" => vec![Operand::Text(self.name.clone())],
            "price" => vec![Operand::Decimal(self.price)],
            "stock" => vec![Operand::Int(i64::from(self.stock))],
            _ => Vec::new(),
        }
    }
}

/// True when `record` satisfies every predicate.
pub fn matches_all<R: Filterable>(record: &R, predicates: &[Predicate]) -> bool {
    predicates
        .iter()
        .all(|predicate| predicate.matches(&record.values(predicate.field)))
}

/// Sort directive parsed from an `orderBy` string such as `-price`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub descending: bool,
}

impl OrderBy {
    /// Parse `[-]field`, accepting camelCase or snake_case names from `allowed`.
    pub fn parse(raw: &str, allowed: &[&'static str]) -> Result<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let snake = to_snake_case(name);
        let field = allowed
            .iter()
            .copied()
            .find(|candidate| *candidate == snake)
            .ok_or_else(|| {
                Error::validation(
                    "orderBy",
                    format!(
                        "Cannot sort by '{}'; expected one of: {}",
                        name,
                        allowed.join(", ")
                    ),
                )
            })?;
        Ok(Self { field, descending })
    }

    /// Parse an optional directive; blank strings mean no sorting.
    pub fn parse_opt(raw: Option<&str>, allowed: &[&'static str]) -> Result<Option<Self>> {
        match raw {
            Some(s) if !s.trim().is_empty() => Self::parse(s, allowed).map(Some),
            _ => Ok(None),
        }
    }

    /// Stable sort; records without a value for the field sort first.
    pub fn sort<R: Filterable>(&self, records: &mut [R]) {
        records.sort_by(|a, b| {
            let left = a.values(self.field).into_iter().next();
            let right = b.values(self.field).into_iter().next();
            let ordering = match (&left, &right) {
                (Some(l), Some(r)) => l.compare(r).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Customer filter
#[derive(InputObject, Debug, Clone, Default)]
pub struct CustomerFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Case-insensitive substring of the email
    pub email: Option<String>,
    pub created_at_gte: Option<DateTime>,
    pub created_at_lte: Option<DateTime>,
    /// Phone starts with this value, or the customer has no phone
    pub phone_startswith: Option<String>,
}

impl CustomerFilter {
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        push_text(&mut predicates, "name", Lookup::IContains, &self.name);
        push_text(&mut predicates, "email", Lookup::IContains, &self.email);
        if let Some(DateTime(at)) = self.created_at_gte {
            predicates.push(Predicate::new("created_at", Lookup::Gte, Operand::DateTime(at)));
        }
        if let Some(DateTime(at)) = self.created_at_lte {
            predicates.push(Predicate::new("created_at", Lookup::Lte, Operand::DateTime(at)));
        }
        push_text(
            &mut predicates,
            "phone",
            Lookup::StartsWithOrNull,
            &self.phone_startswith,
        );
        predicates
    }
}

/// Product filter
#[derive(InputObject, Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub price_gte: Option<Decimal>,
    pub price_lte: Option<Decimal>,
    pub stock_gte: Option<i32>,
    pub stock_lte: Option<i32>,
    /// When true, only products with fewer than 10 units in stock
    pub low_stock: Option<bool>,
}

impl ProductFilter {
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        push_text(&mut predicates, "name", Lookup::IContains, &self.name);
        if let Some(Decimal(price)) = self.price_gte {
            predicates.push(Predicate::new("price", Lookup::Gte, Operand::Decimal(price)));
        }
        if let Some(Decimal(price)) = self.price_lte {
            predicates.push(Predicate::new("price", Lookup::Lte, Operand::Decimal(price)));
        }
        if let Some(stock) = self.stock_gte {
            predicates.push(Predicate::new("stock", Lookup::Gte, Operand::Int(stock.into())));
        }
        if let Some(stock) = self.stock_lte {
            predicates.push(Predicate::new("stock", Lookup::Lte, Operand::Int(stock.into())));
        }
        if self.low_stock == Some(true) {
            predicates.push(Predicate::new(
                "stock",
                Lookup::Lt,
                Operand::Int(LOW_STOCK_THRESHOLD),
            ));
        }
        predicates
    }
}

/// Order filter, including pass-through filters on the related customer and products
#[derive(InputObject, Debug, Clone, Default)]
pub struct OrderFilter {
    pub total_amount_gte: Option<Decimal>,
    pub total_amount_lte: Option<Decimal>,
    pub order_date_gte: Option<DateTime>,
    pub order_date_lte: Option<DateTime>,
    /// Case-insensitive substring of the customer's name
    pub customer_name: Option<String>,
    /// Case-insensitive substring of any ordered product's name
    pub product_name: Option<String>,
    /// Orders containing this product (numeric or global id)
    pub product_id: Option<ID>,
}

impl OrderFilter {
    pub fn predicates(&self) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();
        if let Some(Decimal(amount)) = self.total_amount_gte {
            predicates.push(Predicate::new(
                "total_amount",
                Lookup::Gte,
                Operand::Decimal(amount),
            ));
        }
        if let Some(Decimal(amount)) = self.total_amount_lte {
            predicates.push(Predicate::new(
                "total_amount",
                Lookup::Lte,
                Operand::Decimal(amount),
            ));
        }
        if let Some(DateTime(at)) = self.order_date_gte {
            predicates.push(Predicate::new("order_date", Lookup::Gte, Operand::DateTime(at)));
        }
        if let Some(DateTime(at)) = self.order_date_lte {
            predicates.push(Predicate::new("order_date", Lookup::Lte, Operand::DateTime(at)));
        }
        push_text(
            &mut predicates,
            "customer_name",
            Lookup::IContains,
            &self.customer_name,
        );
        push_text(
            &mut predicates,
            "product_name",
            Lookup::IContains,
            &self.product_name,
        );
        if let Some(id) = &self.product_id {
            let pk = relay::decode_pk(NodeKind::Product, id)?;
            predicates.push(Predicate::new("product_id", Lookup::Exact, Operand::Id(pk)));
        }
        Ok(predicates)
    }
}

/// Empty strings are treated as "no filter".
fn push_text(
    predicates: &mut Vec<Predicate>,
    field: &'static str,
    lookup: Lookup,
    value: &Option<String>,
) {
    if let Some(text) = value.as_deref().filter(|s| !s.is_empty()) {
        predicates.push(Predicate::new(field, lookup, Operand::Text(text.to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn customer(id: u64, name: &str, phone: Option<&str>) -> Customer {
        Customer {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: phone.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
        }
    }

    fn product(id: u64, price: &str, stock: i32) -> Product {
        Product {
            id,
            name: format!("Item {}", id),
            price: RustDecimal::from_str(price).unwrap(),
            stock,
        }
    }

    #[test]
    fn test_icontains_is_case_insensitive() {
        let filter = CustomerFilter {
            name: Some("ALI".to_string()),
            ..Default::default()
        };
        let predicates = filter.predicates();
        assert!(matches_all(&customer(1, "Alice", None), &predicates));
        assert!(!matches_all(&customer(2, "Bob", None), &predicates));
    }

    #[test]
    fn test_phone_startswith_includes_missing_phone() {
        let filter = CustomerFilter {
            phone_startswith: Some("+1".to_string()),
            ..Default::default()
        };
        let predicates = filter.predicates();
        assert!(matches_all(&customer(1, "A", Some("+1555000")), &predicates));
        assert!(matches_all(&customer(2, "B", None), &predicates));
        assert!(!matches_all(&customer(3, "C", Some("555-123-4567")), &predicates));
    }

    #[test]
    fn test_created_at_range() {
        let filter = CustomerFilter {
            created_at_gte: Some(DateTime(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())),
            created_at_lte: Some(DateTime(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap())),
            ..Default::default()
        };
        let predicates = filter.predicates();
        let kept: Vec<u64> = (1..=4)
            .map(|id| customer(id, "X", None))
            .filter(|c| matches_all(c, &predicates))
            .map(|c| c.id)
            .collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[test]
    fn test_price_range_and_low_stock() {
        let filter = ProductFilter {
            price_gte: Some(Decimal(RustDecimal::from_str("10").unwrap())),
            price_lte: Some(Decimal(RustDecimal::from_str("100").unwrap())),
            low_stock: Some(true),
            ..Default::default()
        };
        let predicates = filter.predicates();
        assert!(matches_all(&product(1, "10.00", 9), &predicates));
        assert!(!matches_all(&product(2, "10.00", 10), &predicates));
        assert!(!matches_all(&product(3, "100.01", 0), &predicates));
    }

    #[test]
    fn test_low_stock_false_is_no_filter() {
        let filter = ProductFilter {
            low_stock: Some(false),
            ..Default::default()
        };
        assert!(filter.predicates().is_empty());
    }

    #[test]
    fn test_order_by_parsing() {
        let order = OrderBy::parse("-createdAt", CUSTOMER_SORT_FIELDS).unwrap();
        assert_eq!(order.field, "created_at");
        assert!(order.descending);

        let order = OrderBy::parse("total_amount", ORDER_SORT_FIELDS).unwrap();
        assert_eq!(order.field, "total_amount");
        assert!(!order.descending);

        assert!(matches!(
            OrderBy::parse("password", CUSTOMER_SORT_FIELDS),
            Err(Error::Validation { .. })
        ));
        assert_eq!(OrderBy::parse_opt(Some(" "), PRODUCT_SORT_FIELDS).unwrap(), None);
    }

    #[test]
    fn test_sort_descending_with_missing_values() {
        let mut customers = vec![
            customer(1, "A", Some("+200")),
            customer(2, "B", None),
            customer(3, "C", Some("+300")),
        ];
        OrderBy::parse("phone", CUSTOMER_SORT_FIELDS)
            .unwrap()
            .sort(&mut customers);
        let ids: Vec<u64> = customers.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        OrderBy::parse("-phone", CUSTOMER_SORT_FIELDS)
            .unwrap()
            .sort(&mut customers);
        let ids: Vec<u64> = customers.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
