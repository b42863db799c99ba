//! Persistence for customers, products and orders
//!
//! [`Store`] is the seam between mutation handlers and storage. Each write
//! method is one transaction: its uniqueness and reference checks and the
//! insert either all happen or none do.
//!
//! [`MemoryStore`] keeps every table behind a single `RwLock`; a write
//! holds the write guard for the whole method.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::filters::{matches_all, Filterable, Operand, OrderBy, Predicate};
use crate::model::{order_total, Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
use crate::{Error, Result};

/// Storage backend for the CRM
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a customer; fails if the email is already taken.
    async fn insert_customer(&self, new: NewCustomer) -> Result<Customer>;

    async fn insert_product(&self, new: NewProduct) -> Result<Product>;

    /// Insert an order after resolving its customer and products.
    ///
    /// The total amount is computed from the products' prices as they are
    /// at insert time, under the same lock as the insert.
    async fn insert_order(&self, new: NewOrder) -> Result<Order>;

    async fn list_customers(
        &self,
        predicates: &[Predicate],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Customer>>;

    async fn list_products(
        &self,
        predicates: &[Predicate],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Product>>;

    async fn list_orders(
        &self,
        predicates: &[Predicate],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Order>>;

    /// Load customers by id; missing ids are skipped.
    async fn customers_by_ids(&self, ids: &[u64]) -> Result<Vec<Customer>>;

    /// Load products by id; missing ids are skipped.
    async fn products_by_ids(&self, ids: &[u64]) -> Result<Vec<Product>>;

    async fn order_by_id(&self, id: u64) -> Result<Option<Order>>;
}

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<u64, Customer>,
    products: BTreeMap<u64, Product>,
    orders: BTreeMap<u64, Order>,
    next_customer_id: u64,
    next_product_id: u64,
    next_order_id: u64,
}

impl Tables {
    fn allocate(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }

    fn email_taken(&self, email: &str) -> bool {
        self.customers.values().any(|c| c.email == email)
    }
}

/// In-memory [`Store`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An order joined with its customer and products, for relational filters.
struct OrderView<'a> {
    order: &'a Order,
    customer: Option<&'a Customer>,
    products: Vec<&'a Product>,
}

impl<'a> OrderView<'a> {
    fn join(order: &'a Order, tables: &'a Tables) -> Self {
        Self {
            order,
            customer: tables.customers.get(&order.customer_id),
            products: order
                .product_ids
                .iter()
                .filter_map(|id| tables.products.get(id))
                .collect(),
        }
    }
}

impl Filterable for OrderView<'_> {
    fn values(&self, field: &str) -> Vec<Operand> {
        match field {
            "id" => vec![Operand::Id(self.order.id)],
            "total_amount" => vec![Operand::Decimal(self.order.total_amount)],
            "order_date" => vec![Operand::DateTime(self.order.order_date)],
            "customer_name" => self
                .customer
                .map(|c| Operand::Text(c.name.clone()))
                .into_iter()
                .collect(),
            "product_name" => self
                .products
                .iter()
                .map(|p| Operand::Text(p.name.clone()))
                .collect(),
            "product_id" => self.order.product_ids.iter().copied().map(Operand::Id).collect(),
            _ => Vec::new(),
        }
    }
}

fn select<R: Filterable>(
    rows: impl Iterator<Item = R>,
    predicates: &[Predicate],
    order_by: Option<&OrderBy>,
) -> Vec<R> {
    let mut selected: Vec<R> = rows.filter(|row| matches_all(row, predicates)).collect();
    if let Some(order_by) = order_by {
        order_by.sort(&mut selected);
    }
    selected
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_customer(&self, new: NewCustomer) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&new.email) {
            return Err(Error::validation(
                "email",
                format!("A customer with email {} already exists.", new.email),
            ));
        }
        let id = Tables::allocate(&mut tables.next_customer_id);
        let customer = Customer {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            created_at: Utc::now(),
        };
        tables.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let id = Tables::allocate(&mut tables.next_product_id);
        let product = Product {
            id,
            name: new.name,
            price: new.price,
            stock: new.stock,
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&new.customer_id) {
            return Err(Error::not_found("Customer", vec![new.customer_id]));
        }
        let missing: Vec<u64> = new
            .product_ids
            .iter()
            .copied()
            .filter(|id| !tables.products.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(Error::not_found("Product", missing));
        }
        let total_amount = order_total(
            new.product_ids
                .iter()
                .filter_map(|id| tables.products.get(id)),
        )?;
        let id = Tables::allocate(&mut tables.next_order_id);
        let order = Order {
            id,
            customer_id: new.customer_id,
            product_ids: new.product_ids,
            order_date: new.order_date,
            total_amount,
        };
        tables.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn list_customers(
        &self,
        predicates: &[Predicate],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(select(tables.customers.values().cloned(), predicates, order_by))
    }

    async fn list_products(
        &self,
        predicates: &[Predicate],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(select(tables.products.values().cloned(), predicates, order_by))
    }

    async fn list_orders(
        &self,
        predicates: &[Predicate],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut views: Vec<OrderView<'_>> = tables
            .orders
            .values()
            .map(|order| OrderView::join(order, &tables))
            .filter(|view| matches_all(view, predicates))
            .collect();
        if let Some(order_by) = order_by {
            order_by.sort(&mut views);
        }
        Ok(views.into_iter().map(|view| view.order.clone()).collect())
    }

    async fn customers_by_ids(&self, ids: &[u64]) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.customers.get(id).cloned())
            .collect())
    }

    async fn products_by_ids(&self, ids: &[u64]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn order_by_id(&self, id: u64) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }
}
