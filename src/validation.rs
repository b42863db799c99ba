//! Input validation for CRM mutations
//!
//! Every check here is a pure function over the submitted values. Checks
//! that need persisted state (email uniqueness, referenced ids existing)
//! run inside the store's write section instead.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::{Error, Result};

/// Maximum length of an email address (RFC 5321).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// E.164 style international number, e.g. `+14155550123`.
static INTERNATIONAL_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("Invalid regex"));

/// North American style number, e.g. `415-555-0123`.
static DASHED_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").expect("Invalid regex"));

/// Check a phone number against the two accepted formats.
pub fn is_valid_phone(phone: &str) -> bool {
    INTERNATIONAL_PHONE.is_match(phone) || DASHED_PHONE.is_match(phone)
}

/// Structural email check: one `@`, non-empty local part and domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Require a non-blank name and return it trimmed.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("name", "Name is required."));
    }
    Ok(trimmed.to_string())
}

pub fn validate_email(email: &str) -> Result<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("email", "Email is required."));
    }
    if !is_valid_email(trimmed) {
        return Err(Error::validation(
            "email",
            format!("Invalid email format: {}", trimmed),
        ));
    }
    Ok(trimmed.to_string())
}

/// Normalize an optional phone: blank means absent, anything else must match a format.
pub fn validate_phone(phone: Option<&str>) -> Result<Option<String>> {
    match phone.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) if is_valid_phone(p) => Ok(Some(p.to_string())),
        Some(p) => Err(Error::validation(
            "phone",
            format!(
                "Invalid phone number format: {} (expected +<digits> or ###-###-####)",
                p
            ),
        )),
    }
}

pub fn validate_price(price: Decimal) -> Result<Decimal> {
    if price <= Decimal::ZERO {
        return Err(Error::validation("price", "Price must be greater than zero."));
    }
    Ok(price)
}

pub fn validate_stock(stock: i32) -> Result<i32> {
    if stock < 0 {
        return Err(Error::validation("stock", "Stock cannot be negative."));
    }
    Ok(stock)
}

/// Require at least one product id and collapse repeats, keeping first-seen order.
pub fn validate_product_ids(ids: &[u64]) -> Result<Vec<u64>> {
    if ids.is_empty() {
        return Err(Error::validation(
            "productIds",
            "At least one product ID must be provided.",
        ));
    }
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_phone_formats() {
        assert!(is_valid_phone("+1234567890"));
        assert!(is_valid_phone("123-456-7890"));
        assert!(!is_valid_phone("1234567890"));
        assert!(!is_valid_phone("+0123"));
        assert!(!is_valid_phone("123-4567-890"));
        assert!(!is_valid_phone("+1 234 567"));
        assert!(!is_valid_phone("+1234567890123456"));
    }

    #[test]
    fn test_blank_phone_is_absent() {
        assert_eq!(validate_phone(None).unwrap(), None);
        assert_eq!(validate_phone(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_phone(Some("555-123-4567")).unwrap(),
            Some("555-123-4567".to_string())
        );
    }

    #[test]
    fn test_invalid_phone_reports_field() {
        match validate_phone(Some("call me")) {
            Err(Error::Validation { field, .. }) => assert_eq!(field, "phone"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("user.name+tag@domain.co.uk"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-symbol"));
        assert!(!is_valid_email("@domain.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("a@b@c"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(&format!("{}@x.io", "a".repeat(260))));
    }

    #[test]
    fn test_name_is_trimmed_and_required() {
        assert_eq!(validate_name("  Alice ").unwrap(), "Alice");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_price_and_stock_bounds() {
        assert!(validate_price(Decimal::ZERO).is_err());
        assert!(validate_price(Decimal::from_str("-1.50").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("0.01").unwrap()).is_ok());
        assert!(validate_stock(-1).is_err());
        assert_eq!(validate_stock(0).unwrap(), 0);
    }

    #[test]
    fn test_product_ids_deduplicated() {
        assert_eq!(validate_product_ids(&[3, 1, 3, 2, 1]).unwrap(), vec![3, 1, 2]);
        assert!(validate_product_ids(&[]).is_err());
    }
}
