//! Mutation handlers and list queries
//!
//! Each handler validates its input, hands the normalized record to the
//! [`Store`], and returns the persisted entity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use crate::filters::{
    CustomerFilter, OrderBy, OrderFilter, ProductFilter, CUSTOMER_SORT_FIELDS,
    ORDER_SORT_FIELDS, PRODUCT_SORT_FIELDS,
};
use crate::model::{Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
use crate::pagination::{Connection, PaginationInput};
use crate::store::Store;
use crate::validation;
use crate::{Error, Result};

/// Unvalidated customer fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Unvalidated product fields as submitted by a client.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
}

/// Order request with references already resolved to primary keys.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer_id: u64,
    pub product_ids: Vec<u64>,
    pub order_date: Option<DateTime<Utc>>,
}

/// One rejected record of a bulk customer creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// Zero-based position in the submitted batch
    pub index: usize,
    pub email: String,
    pub error: Error,
}

impl BulkFailure {
    pub fn message(&self) -> String {
        format!("record {} ({}): {}", self.index, self.email, self.error)
    }
}

/// Result of a bulk creation: created records and per-record failures, both in input order
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub created: Vec<Customer>,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(BulkFailure::message).collect()
    }
}

/// CRM operations over a [`Store`]
#[derive(Clone)]
pub struct CrmService {
    store: Arc<dyn Store>,
}

impl CrmService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    fn validate_customer(draft: &CustomerDraft) -> Result<NewCustomer> {
        Ok(NewCustomer {
            name: validation::validate_name(&draft.name)?,
            email: validation::validate_email(&draft.email)?,
            phone: validation::validate_phone(draft.phone.as_deref())?,
        })
    }

    #[instrument(skip(self, draft), fields(email = %draft.email))]
    pub async fn create_customer(&self, draft: CustomerDraft) -> Result<Customer> {
        let new = Self::validate_customer(&draft)?;
        let customer = self.store.insert_customer(new).await?;
        tracing::info!(customer_id = customer.id, "customer created");
        Ok(customer)
    }

    /// Create each record independently; invalid records are reported, never fatal.
    #[instrument(skip(self, drafts), fields(batch = drafts.len()))]
    pub async fn bulk_create_customers(&self, drafts: Vec<CustomerDraft>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            let result = match Self::validate_customer(&draft) {
                Ok(new) => self.store.insert_customer(new).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(customer) => outcome.created.push(customer),
                Err(error) => outcome.failures.push(BulkFailure {
                    index,
                    email: draft.email,
                    error,
                }),
            }
        }
        tracing::info!(
            created = outcome.created.len(),
            failed = outcome.failures.len(),
            "bulk customer creation finished"
        );
        outcome
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let new = NewProduct {
            name: validation::validate_name(&draft.name)?,
            price: validation::validate_price(draft.price)?,
            stock: validation::validate_stock(draft.stock)?,
        };
        let product = self.store.insert_product(new).await?;
        tracing::info!(product_id = product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, draft), fields(customer_id = draft.customer_id))]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order> {
        let new = NewOrder {
            customer_id: draft.customer_id,
            product_ids: validation::validate_product_ids(&draft.product_ids)?,
            order_date: draft.order_date.unwrap_or_else(Utc::now),
        };
        let order = self.store.insert_order(new).await?;
        tracing::info!(
            order_id = order.id,
            total_amount = %order.total_amount,
            "order created"
        );
        Ok(order)
    }

    pub async fn list_customers(
        &self,
        filter: Option<&CustomerFilter>,
        order_by: Option<&str>,
        page: &PaginationInput,
    ) -> Result<Connection<Customer>> {
        let order_by = OrderBy::parse_opt(order_by, CUSTOMER_SORT_FIELDS)?;
        let predicates = filter.map(CustomerFilter::predicates).unwrap_or_default();
        let rows = self
            .store
            .list_customers(&predicates, order_by.as_ref())
            .await?;
        Connection::paginate(rows, page)
    }

    pub async fn list_products(
        &self,
        filter: Option<&ProductFilter>,
        order_by: Option<&str>,
        page: &PaginationInput,
    ) -> Result<Connection<Product>> {
        let order_by = OrderBy::parse_opt(order_by, PRODUCT_SORT_FIELDS)?;
        let predicates = filter.map(ProductFilter::predicates).unwrap_or_default();
        let rows = self
            .store
            .list_products(&predicates, order_by.as_ref())
            .await?;
        Connection::paginate(rows, page)
    }

    pub async fn list_orders(
        &self,
        filter: Option<&OrderFilter>,
        order_by: Option<&str>,
        page: &PaginationInput,
    ) -> Result<Connection<Order>> {
        let order_by = OrderBy::parse_opt(order_by, ORDER_SORT_FIELDS)?;
        let predicates = match filter {
            Some(filter) => filter.predicates()?,
            None => Vec::new(),
        };
        let rows = self.store.list_orders(&predicates, order_by.as_ref()).await?;
        Connection::paginate(rows, page)
    }

    pub async fn customer(&self, id: u64) -> Result<Option<Customer>> {
        Ok(self.store.customers_by_ids(&[id]).await?.into_iter().next())
    }

    pub async fn product(&self, id: u64) -> Result<Option<Product>> {
        Ok(self.store.products_by_ids(&[id]).await?.into_iter().next())
    }

    pub async fn order(&self, id: u64) -> Result<Option<Order>> {
        self.store.order_by_id(id).await
    }
}
