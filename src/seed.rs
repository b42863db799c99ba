//! Random sample data for local development
//!
//! Records are created through [`CrmService`], so seeded data passes the
//! same validation and order totals are computed the same way.

use rand::seq::IndexedRandom;
use rand::Rng;
use rust_decimal::Decimal;

use crate::service::{CrmService, CustomerDraft, OrderDraft, ProductDraft};
use crate::Result;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances", "Ken", "Radia", "Linus",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Allen", "Thompson",
    "Perlman", "Torvalds",
];
const PRODUCT_NAMES: &[&str] = &[
    "Laptop", "Monitor", "Keyboard", "Mouse", "Headset", "Webcam", "Dock", "Cable", "Charger",
    "Stand", "Speaker", "Tablet",
];

/// How many records of each kind to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
}

impl Default for SeedCounts {
    fn default() -> Self {
        Self {
            customers: 10,
            products: 20,
            orders: 5,
        }
    }
}

/// Populate the store behind `service` with random customers, products and orders.
pub async fn seed(service: &CrmService, counts: SeedCounts, rng: &mut impl Rng) -> Result<()> {
    let mut customers = Vec::with_capacity(counts.customers);
    for i in 0..counts.customers {
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Sam");
        let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
        let phone = if rng.random_bool(0.8) {
            Some(format!(
                "{:03}-{:03}-{:04}",
                rng.random_range(200..1000),
                rng.random_range(0..1000),
                rng.random_range(0..10000)
            ))
        } else {
            None
        };
        let customer = service
            .create_customer(CustomerDraft {
                name: format!("{} {}", first, last),
                email: format!(
                    "{}.{}{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    i
                ),
                phone,
            })
            .await?;
        customers.push(customer.id);
    }

    let mut products = Vec::with_capacity(counts.products);
    for _ in 0..counts.products {
        let name = PRODUCT_NAMES.choose(rng).copied().unwrap_or("Gadget");
        let product = service
            .create_product(ProductDraft {
                name: name.to_string(),
                price: Decimal::new(rng.random_range(1_000..=100_000), 2),
                stock: rng.random_range(0..=100),
            })
            .await?;
        products.push(product.id);
    }

    if customers.is_empty() || products.is_empty() {
        tracing::warn!("no customers or products available to create orders");
        return Ok(());
    }

    for _ in 0..counts.orders {
        let Some(&customer_id) = customers.choose(rng) else {
            break;
        };
        let size = rng.random_range(1..=products.len().min(5));
        let product_ids: Vec<u64> = products.choose_multiple(rng, size).copied().collect();
        let order = service
            .create_order(OrderDraft {
                customer_id,
                product_ids,
                order_date: None,
            })
            .await?;
        tracing::debug!(order_id = order.id, total = %order.total_amount, "seeded order");
    }

    tracing::info!(
        customers = counts.customers,
        products = counts.products,
        orders = counts.orders,
        "seeded sample data"
    );
    Ok(())
}
