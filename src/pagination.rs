//! Relay-style cursor pagination
//!
//! List queries load the full filtered, sorted result and slice it here.
//! Cursors are base64 of `arrayconnection:<offset>`.

use std::borrow::Cow;

use async_graphql::{Object, OutputType, SimpleObject, TypeName};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{Error, Result};

/// Page size used when neither `first` nor `last` is given.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest accepted `first`/`last`.
pub const MAX_PAGE_SIZE: i32 = 100;

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Page information
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[Object(name_type)]
impl<T: OutputType> Edge<T> {
    async fn cursor(&self) -> &str {
        &self.cursor
    }

    async fn node(&self) -> &T {
        &self.node
    }
}

impl<T: OutputType> TypeName for Edge<T> {
    fn type_name() -> Cow<'static, str> {
        format!("{}Edge", <T as OutputType>::type_name()).into()
    }
}

/// Connection (paginated result)
#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total_count: usize,
}

#[Object(name_type)]
impl<T: OutputType> Connection<T> {
    async fn edges(&self) -> &[Edge<T>] {
        &self.edges
    }

    async fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    /// Number of records matching the filter, across all pages
    async fn total_count(&self) -> usize {
        self.total_count
    }
}

impl<T: OutputType> TypeName for Connection<T> {
    fn type_name() -> Cow<'static, str> {
        format!("{}Connection", <T as OutputType>::type_name()).into()
    }
}

impl<T> Connection<T> {
    /// Slice `items` according to `input` and wrap the page in a connection.
    pub fn paginate(items: Vec<T>, input: &PaginationInput) -> Result<Self> {
        input.validate()?;
        let total_count = items.len();

        let lower_bound = match &input.after {
            Some(cursor) => CursorCodec::decode_offset(cursor)?
                .checked_add(1)
                .ok_or_else(|| Error::InvalidCursor(cursor.clone()))?
                .min(total_count),
            None => 0,
        };
        let upper_bound = match &input.before {
            Some(cursor) => CursorCodec::decode_offset(cursor)?.min(total_count),
            None => total_count,
        };

        let mut start = lower_bound;
        let mut end = upper_bound.max(start);
        let first = input.effective_first();
        if let Some(first) = first {
            end = end.min(start + first);
        }
        if let Some(last) = input.last {
            start = start.max(end.saturating_sub(last as usize));
        }

        let edges: Vec<Edge<T>> = items
            .into_iter()
            .enumerate()
            .skip(start)
            .take(end - start)
            .map(|(offset, node)| Edge {
                cursor: CursorCodec::encode_offset(offset),
                node,
            })
            .collect();

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        Ok(Self {
            edges,
            page_info: PageInfo {
                has_next_page: first.is_some() && end < upper_bound,
                has_previous_page: input.last.is_some() && start > lower_bound,
                start_cursor,
                end_cursor,
            },
            total_count,
        })
    }

    /// Transform every node, keeping cursors and page info.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Connection<U> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    cursor: edge.cursor,
                    node: f(edge.node),
                })
                .collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }
}

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| Error::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidCursor(e.to_string()))
    }

    pub fn encode_offset(offset: usize) -> String {
        Self::encode(&format!("{}{}", CURSOR_PREFIX, offset))
    }

    pub fn decode_offset(cursor: &str) -> Result<usize> {
        let decoded = Self::decode(cursor)?;
        decoded
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|offset| offset.parse::<usize>().ok())
            .ok_or_else(|| Error::InvalidCursor(cursor.to_string()))
    }
}

/// Pagination arguments of a connection field
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
#[derive(Debug, Clone, Default)]
pub struct PaginationInput {
    /// Number of items to return (forward pagination)
    pub first: Option<i32>,

    /// Cursor to start after (forward pagination)
    pub after: Option<String>,

    /// Number of items to return (backward pagination)
    pub last: Option<i32>,

    /// Cursor to end before (backward pagination)
    pub before: Option<String>,
}

impl PaginationInput {
    /// Validate pagination input
    pub fn validate(&self) -> Result<()> {
        if self.first.is_some() && self.last.is_some() {
            return Err(Error::validation(
                "first",
                "Cannot specify both 'first' and 'last'",
            ));
        }

        for (name, value) in [("first", self.first), ("last", self.last)] {
            if let Some(value) = value {
                if value < 0 {
                    return Err(Error::validation(
                        name,
                        format!("'{}' must be non-negative", name),
                    ));
                }
                if value > MAX_PAGE_SIZE {
                    return Err(Error::validation(
                        name,
                        format!("'{}' cannot exceed {}", name, MAX_PAGE_SIZE),
                    ));
                }
            }
        }

        Ok(())
    }

    /// `first`, or the default page size when no bound was given at all.
    fn effective_first(&self) -> Option<usize> {
        match (self.first, self.last) {
            (Some(first), _) => Some(first as usize),
            (None, None) => Some(DEFAULT_PAGE_SIZE),
            (None, Some(_)) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: usize, input: PaginationInput) -> Connection<usize> {
        Connection::paginate((0..items).collect(), &input).unwrap()
    }

    fn nodes(conn: &Connection<usize>) -> Vec<usize> {
        conn.edges.iter().map(|e| e.node).collect()
    }

    #[test]
    fn test_cursor_codec() {
        let original = "test-cursor";
        let encoded = CursorCodec::encode(original);
        let decoded = CursorCodec::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(CursorCodec::decode_offset(&CursorCodec::encode_offset(7)).unwrap(), 7);
        assert!(CursorCodec::decode_offset(&CursorCodec::encode("other:7")).is_err());
        assert!(CursorCodec::decode_offset("%%%").is_err());
    }

    #[test]
    fn test_after_cursor_at_max_offset() {
        let input = PaginationInput {
            after: Some(CursorCodec::encode_offset(usize::MAX)),
            ..Default::default()
        };
        let result = Connection::paginate((0..5).collect::<Vec<i32>>(), &input);
        assert!(matches!(result, Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn test_default_page_size() {
        let conn = page(25, PaginationInput::default());
        assert_eq!(conn.edges.len(), DEFAULT_PAGE_SIZE);
        assert_eq!(conn.total_count, 25);
        assert!(conn.page_info.has_next_page);
        assert!(!conn.page_info.has_previous_page);
    }

    #[test]
    fn test_forward_pagination() {
        let first_page = page(
            5,
            PaginationInput {
                first: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(nodes(&first_page), vec![0, 1]);

        let second_page = page(
            5,
            PaginationInput {
                first: Some(2),
                after: first_page.page_info.end_cursor.clone(),
                ..Default::default()
            },
        );
        assert_eq!(nodes(&second_page), vec![2, 3]);
        assert!(second_page.page_info.has_next_page);

        let last_page = page(
            5,
            PaginationInput {
                first: Some(2),
                after: second_page.page_info.end_cursor.clone(),
                ..Default::default()
            },
        );
        assert_eq!(nodes(&last_page), vec![4]);
        assert!(!last_page.page_info.has_next_page);
    }

    #[test]
    fn test_backward_pagination() {
        let conn = page(
            5,
            PaginationInput {
                last: Some(2),
                before: Some(CursorCodec::encode_offset(4)),
                ..Default::default()
            },
        );
        assert_eq!(nodes(&conn), vec![2, 3]);
        assert!(conn.page_info.has_previous_page);
        assert!(!conn.page_info.has_next_page);
    }

    #[test]
    fn test_empty_connection() {
        let conn = page(0, PaginationInput::default());
        assert!(conn.edges.is_empty());
        assert_eq!(conn.page_info.start_cursor, None);
        assert!(!conn.page_info.has_next_page);
    }

    #[test]
    fn test_validate_bounds() {
        let both = PaginationInput {
            first: Some(1),
            last: Some(1),
            ..Default::default()
        };
        assert!(both.validate().is_err());
        let too_many = PaginationInput {
            first: Some(101),
            ..Default::default()
        };
        assert!(too_many.validate().is_err());
        let negative = PaginationInput {
            last: Some(-1),
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }
}
