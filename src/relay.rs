//! Relay global object identification
//!
//! Global ids are base64 of `<Type>:<pk>`. Mutation inputs and filters also
//! accept the bare numeric primary key.

use async_graphql::ID;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{Error, Result};

/// Object types addressable through `node(id:)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Customer,
    Product,
    Order,
}

impl NodeKind {
    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Customer => "Customer",
            NodeKind::Product => "Product",
            NodeKind::Order => "Order",
        }
    }

    fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "Customer" => Some(NodeKind::Customer),
            "Product" => Some(NodeKind::Product),
            "Order" => Some(NodeKind::Order),
            _ => None,
        }
    }
}

/// Encode a global id for `pk`.
pub fn encode_global_id(kind: NodeKind, pk: u64) -> ID {
    ID(BASE64.encode(format!("{}:{}", kind.type_name(), pk)))
}

/// Decode a global id into its type and primary key.
pub fn decode_global_id(id: &str) -> Result<(NodeKind, u64)> {
    let invalid = || Error::InvalidId(id.to_string());
    let bytes = BASE64.decode(id.as_bytes()).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (type_name, pk) = text.split_once(':').ok_or_else(invalid)?;
    let kind = NodeKind::from_type_name(type_name).ok_or_else(invalid)?;
    let pk = pk.parse::<u64>().map_err(|_| invalid())?;
    Ok((kind, pk))
}

/// Resolve a reference to a primary key of `expected` type.
///
/// Accepts a bare number (`"12"`) or a global id of the matching type.
pub fn decode_pk(expected: NodeKind, id: &ID) -> Result<u64> {
    let raw = id.as_str().trim();
    if let Ok(pk) = raw.parse::<u64>() {
        return Ok(pk);
    }
    match decode_global_id(raw)? {
        (kind, pk) if kind == expected => Ok(pk),
        _ => Err(Error::InvalidId(format!(
            "{} is not a {} id",
            raw,
            expected.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_id_round_trip() {
        let id = encode_global_id(NodeKind::Order, 42);
        assert_eq!(decode_global_id(&id).unwrap(), (NodeKind::Order, 42));
    }

    #[test]
    fn test_decode_pk_accepts_numeric_and_global() {
        assert_eq!(decode_pk(NodeKind::Customer, &ID::from("7")).unwrap(), 7);
        let global = encode_global_id(NodeKind::Customer, 7);
        assert_eq!(decode_pk(NodeKind::Customer, &global).unwrap(), 7);
    }

    #[test]
    fn test_decode_pk_rejects_wrong_type() {
        let global = encode_global_id(NodeKind::Product, 7);
        assert!(matches!(
            decode_pk(NodeKind::Customer, &global),
            Err(Error::InvalidId(_))
        ));
        assert!(decode_pk(NodeKind::Customer, &ID::from("not-an-id!")).is_err());
    }
}
