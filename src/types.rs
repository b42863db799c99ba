//! Custom GraphQL scalars

use std::str::FromStr;

use async_graphql::{Scalar, ScalarType, Value};
use chrono::{DateTime as ChronoDateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal as RustDecimal;

/// DateTime scalar
///
/// Accepts RFC 3339 timestamps, or a bare `YYYY-MM-DD` date meaning midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime(pub ChronoDateTime<Utc>);

#[Scalar]
impl ScalarType for DateTime {
    fn parse(value: Value) -> async_graphql::InputValueResult<Self> {
        if let Value::String(s) = value {
            if let Ok(dt) = ChronoDateTime::parse_from_rfc3339(&s) {
                return Ok(DateTime(dt.with_timezone(&Utc)));
            }
            let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| format!("Invalid DateTime: {}", e))?;
            let midnight = date.and_hms_opt(0, 0, 0).ok_or("Invalid DateTime")?;
            Ok(DateTime(Utc.from_utc_datetime(&midnight)))
        } else {
            Err("Expected string for DateTime".into())
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_rfc3339())
    }
}

impl From<ChronoDateTime<Utc>> for DateTime {
    fn from(dt: ChronoDateTime<Utc>) -> Self {
        DateTime(dt)
    }
}

/// Exact decimal scalar
///
/// Serialized as a string so no precision is lost; accepts a string or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal(pub RustDecimal);

#[Scalar]
impl ScalarType for Decimal {
    fn parse(value: Value) -> async_graphql::InputValueResult<Self> {
        let text = match &value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err("Expected string or number for Decimal".into()),
        };
        RustDecimal::from_str(&text)
            .or_else(|_| RustDecimal::from_scientific(&text))
            .map(Decimal)
            .map_err(|e| format!("Invalid Decimal: {}", e).into())
    }

    fn is_valid(value: &Value) -> bool {
        matches!(value, Value::String(_) | Value::Number(_))
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_string())
    }
}

impl From<RustDecimal> for Decimal {
    fn from(d: RustDecimal) -> Self {
        Decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_datetime_to_value() {
        let dt = DateTime(Utc::now());
        let value = dt.to_value();
        assert!(matches!(value, Value::String(_)));
    }

    #[test]
    fn test_datetime_accepts_bare_date() {
        let dt = DateTime::parse(Value::String("2024-03-15".into())).unwrap();
        assert_eq!((dt.0.year(), dt.0.month(), dt.0.day()), (2024, 3, 15));
        assert!(DateTime::parse(Value::String("15/03/2024".into())).is_err());
    }

    #[test]
    fn test_decimal_from_number_and_string() {
        let from_number = Decimal::parse(Value::Number(
            async_graphql::Number::from_f64(999.99).unwrap(),
        )).unwrap();
        let from_string = Decimal::parse(Value::String("999.99".into())).unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_string.to_value(), Value::String("999.99".into()));
        assert!(Decimal::parse(Value::String("abc".into())).is_err());
        assert!(Decimal::parse(Value::Boolean(true)).is_err());
    }
}
