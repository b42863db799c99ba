//! # crm-graphql
//!
//! GraphQL CRUD API for a small CRM: customers, products and orders.
//!
//! ## Features
//!
//! - **Mutations** - single and bulk customer creation, product and order creation
//! - **Validation** - email/phone format, price and stock bounds, uniqueness
//! - **Filters** - declarative predicates with an `orderBy` sort directive
//! - **Cursor Pagination** - Relay-style connections and global ids
//! - **DataLoader** - request-scoped cached customer/product loading for order relations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crm_graphql::{build_schema, CrmService, MemoryStore};
//!
//! # async fn example() {
//! let service = CrmService::new(Arc::new(MemoryStore::new()));
//! let schema = build_schema(service, 16);
//! let response = schema.execute("{ hello }").await;
//! # }
//! ```

pub mod config;
pub mod dataloaders;
pub mod filters;
pub mod model;
pub mod pagination;
pub mod relay;
pub mod schema;
pub mod seed;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

pub use config::{Config, ConfigError};
pub use dataloaders::{BatchLoader, DataLoader, Loaders};
pub use filters::{Lookup, Operand, OrderBy, Predicate};
pub use model::{Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
pub use pagination::{Connection, CursorCodec, Edge, PageInfo, PaginationInput};
pub use schema::{build_schema, CrmSchema};
pub use server::{execute, graphql_handler, router, AppState};
pub use service::{BulkOutcome, CrmService};
pub use store::{MemoryStore, Store};
pub use types::{DateTime, Decimal};

use async_graphql::{ErrorExtensions, Value};
use thiserror::Error;

/// CRM errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {}", join_ids(.ids))]
    NotFound { entity: &'static str, ids: Vec<u64> },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, ids: Vec<u64>) -> Self {
        Self::NotFound { entity, ids }
    }

    /// Machine readable code placed in the GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } | Self::InvalidCursor(_) | Self::InvalidId(_) => {
                "VALIDATION_ERROR"
            }
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            match self {
                Self::Validation { field, .. } => e.set("field", field.as_str()),
                Self::NotFound { entity, ids } => {
                    e.set("entity", *entity);
                    e.set(
                        "ids",
                        Value::List(ids.iter().map(|id| Value::Number((*id).into())).collect()),
                    );
                }
                _ => {}
            }
        })
    }
}

/// Result type for CRM operations
pub type Result<T> = std::result::Result<T, Error>;
