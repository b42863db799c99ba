//! GraphQL object types, inputs and root operations

use std::collections::HashMap;

use async_graphql::{
    Context, EmptySubscription, InputObject, Interface, Object, ResultExt, Schema, SimpleObject,
    ID,
};

use crate::dataloaders::Loaders;
use crate::filters::{CustomerFilter, OrderFilter, ProductFilter};
use crate::model::{Customer, Order, Product};
use crate::pagination::{Connection, PaginationInput};
use crate::relay::{self, NodeKind};
use crate::service::{BulkFailure, CrmService, CustomerDraft, OrderDraft, ProductDraft};
use crate::types::{DateTime, Decimal};
use crate::Error;

pub type CrmSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema around `service`.
pub fn build_schema(service: CrmService, depth_limit: usize) -> CrmSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .limit_depth(depth_limit)
        .finish()
}

fn service<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a CrmService> {
    ctx.data::<CrmService>()
}

/// A customer
#[derive(Debug, Clone)]
pub struct CustomerNode(pub Customer);

#[Object(name = "Customer")]
impl CustomerNode {
    /// Global id
    async fn id(&self) -> ID {
        relay::encode_global_id(NodeKind::Customer, self.0.id)
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn phone(&self) -> Option<&str> {
        self.0.phone.as_deref()
    }

    async fn created_at(&self) -> DateTime {
        DateTime(self.0.created_at)
    }
}

/// A product
#[derive(Debug, Clone)]
pub struct ProductNode(pub Product);

#[Object(name = "Product")]
impl ProductNode {
    /// Global id
    async fn id(&self) -> ID {
        relay::encode_global_id(NodeKind::Product, self.0.id)
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn price(&self) -> Decimal {
        Decimal(self.0.price)
    }

    async fn stock(&self) -> i32 {
        self.0.stock
    }
}

/// An order with its customer and products
#[derive(Debug, Clone)]
pub struct OrderNode(pub Order);

#[Object(name = "Order")]
impl OrderNode {
    /// Global id
    async fn id(&self) -> ID {
        relay::encode_global_id(NodeKind::Order, self.0.id)
    }

    async fn order_date(&self) -> DateTime {
        DateTime(self.0.order_date)
    }

    /// Sum of the product prices when the order was placed
    async fn total_amount(&self) -> Decimal {
        Decimal(self.0.total_amount)
    }

    async fn customer(&self, ctx: &Context<'_>) -> async_graphql::Result<CustomerNode> {
        let id = self.0.customer_id;
        let found = match ctx.data_opt::<Loaders>() {
            Some(loaders) => loaders.customers.load(id).await,
            None => service(ctx)?.customer(id).await,
        }
        .extend()?;
        found
            .map(CustomerNode)
            .ok_or_else(|| Error::not_found("Customer", vec![id]))
            .extend()
    }

    async fn products(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<ProductNode>> {
        let ids = &self.0.product_ids;
        let mut found: HashMap<u64, Product> = match ctx.data_opt::<Loaders>() {
            Some(loaders) => loaders.products.load_many(ids).await.extend()?,
            None => service(ctx)?
                .store()
                .products_by_ids(ids)
                .await
                .extend()?
                .into_iter()
                .map(|p| (p.id, p))
                .collect(),
        };
        Ok(ids
            .iter()
            .filter_map(|id| found.remove(id))
            .map(ProductNode)
            .collect())
    }
}

/// Any object addressable by global id
#[derive(Interface)]
#[graphql(field(name = "id", ty = "ID"))]
pub enum Node {
    Customer(CustomerNode),
    Product(ProductNode),
    Order(OrderNode),
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateCustomerInput {
    pub name: String,
    pub email: String,
    /// `+<digits>` or `###-###-####`
    pub phone: Option<String>,
}

impl From<CreateCustomerInput> for CustomerDraft {
    fn from(input: CreateCustomerInput) -> Self {
        CustomerDraft {
            name: input.name,
            email: input.email,
            phone: input.phone,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    #[graphql(default)]
    pub stock: i32,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateOrderInput {
    pub customer_id: ID,
    pub product_ids: Vec<ID>,
    /// Defaults to the time the order is created
    pub order_date: Option<DateTime>,
}

#[derive(SimpleObject)]
pub struct CreateCustomerPayload {
    pub customer: CustomerNode,
    pub message: String,
}

/// A record rejected by `bulkCreateCustomers`
#[derive(SimpleObject)]
pub struct BulkCustomerFailure {
    /// Zero-based position in the submitted list
    pub index: i32,
    pub email: String,
    pub message: String,
}

impl From<&BulkFailure> for BulkCustomerFailure {
    fn from(failure: &BulkFailure) -> Self {
        BulkCustomerFailure {
            index: failure.index as i32,
            email: failure.email.clone(),
            message: failure.error.to_string(),
        }
    }
}

#[derive(SimpleObject)]
pub struct BulkCreateCustomersPayload {
    /// Customers that were created, in input order
    pub customers: Vec<CustomerNode>,
    /// One message per rejected record, in input order
    pub errors: Vec<String>,
    pub failures: Vec<BulkCustomerFailure>,
}

#[derive(SimpleObject)]
pub struct CreateProductPayload {
    pub product: ProductNode,
    pub message: String,
}

#[derive(SimpleObject)]
pub struct CreateOrderPayload {
    pub order: OrderNode,
}

fn page(
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
) -> PaginationInput {
    PaginationInput {
        first,
        after,
        last,
        before,
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn hello(&self) -> &'static str {
        "Hello, GraphQL!"
    }

    /// Fetch any object by global id
    async fn node(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<Node>> {
        let (kind, pk) = relay::decode_global_id(&id).extend()?;
        let service = service(ctx)?;
        let node = match kind {
            NodeKind::Customer => service
                .customer(pk)
                .await
                .extend()?
                .map(|c| Node::Customer(CustomerNode(c))),
            NodeKind::Product => service
                .product(pk)
                .await
                .extend()?
                .map(|p| Node::Product(ProductNode(p))),
            NodeKind::Order => service
                .order(pk)
                .await
                .extend()?
                .map(|o| Node::Order(OrderNode(o))),
        };
        Ok(node)
    }

    #[allow(clippy::too_many_arguments)]
    async fn all_customers(
        &self,
        ctx: &Context<'_>,
        filter: Option<CustomerFilter>,
        #[graphql(desc = "Field to sort by; prefix with '-' for descending")]
        order_by: Option<String>,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
    ) -> async_graphql::Result<Connection<CustomerNode>> {
        let connection = service(ctx)?
            .list_customers(
                filter.as_ref(),
                order_by.as_deref(),
                &page(first, after, last, before),
            )
            .await
            .extend()?;
        Ok(connection.map(CustomerNode))
    }

    #[allow(clippy::too_many_arguments)]
    async fn all_products(
        &self,
        ctx: &Context<'_>,
        filter: Option<ProductFilter>,
        #[graphql(desc = "Field to sort by; prefix with '-' for descending")]
        order_by: Option<String>,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
    ) -> async_graphql::Result<Connection<ProductNode>> {
        let connection = service(ctx)?
            .list_products(
                filter.as_ref(),
                order_by.as_deref(),
                &page(first, after, last, before),
            )
            .await
            .extend()?;
        Ok(connection.map(ProductNode))
    }

    #[allow(clippy::too_many_arguments)]
    async fn all_orders(
        &self,
        ctx: &Context<'_>,
        filter: Option<OrderFilter>,
        #[graphql(desc = "Field to sort by; prefix with '-' for descending")]
        order_by: Option<String>,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
    ) -> async_graphql::Result<Connection<OrderNode>> {
        let connection = service(ctx)?
            .list_orders(
                filter.as_ref(),
                order_by.as_deref(),
                &page(first, after, last, before),
            )
            .await
            .extend()?;
        Ok(connection.map(OrderNode))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_customer(
        &self,
        ctx: &Context<'_>,
        input: CreateCustomerInput,
    ) -> async_graphql::Result<CreateCustomerPayload> {
        let customer = service(ctx)?
            .create_customer(input.into())
            .await
            .extend()?;
        Ok(CreateCustomerPayload {
            customer: CustomerNode(customer),
            message: "Customer created successfully.".to_string(),
        })
    }

    /// Create many customers; invalid records are reported in `errors` and skipped
    async fn bulk_create_customers(
        &self,
        ctx: &Context<'_>,
        input: Vec<CreateCustomerInput>,
    ) -> async_graphql::Result<BulkCreateCustomersPayload> {
        let drafts = input.into_iter().map(CustomerDraft::from).collect();
        let outcome = service(ctx)?.bulk_create_customers(drafts).await;
        Ok(BulkCreateCustomersPayload {
            errors: outcome.messages(),
            failures: outcome.failures.iter().map(BulkCustomerFailure::from).collect(),
            customers: outcome.created.into_iter().map(CustomerNode).collect(),
        })
    }

    async fn create_product(
        &self,
        ctx: &Context<'_>,
        input: CreateProductInput,
    ) -> async_graphql::Result<CreateProductPayload> {
        let product = service(ctx)?
            .create_product(ProductDraft {
                name: input.name,
                price: input.price.0,
                stock: input.stock,
            })
            .await
            .extend()?;
        Ok(CreateProductPayload {
            product: ProductNode(product),
            message: "Product created successfully.".to_string(),
        })
    }

    async fn create_order(
        &self,
        ctx: &Context<'_>,
        input: CreateOrderInput,
    ) -> async_graphql::Result<CreateOrderPayload> {
        let customer_id = relay::decode_pk(NodeKind::Customer, &input.customer_id).extend()?;
        let product_ids = input
            .product_ids
            .iter()
            .map(|id| relay::decode_pk(NodeKind::Product, id))
            .collect::<crate::Result<Vec<u64>>>()
            .extend()?;
        let order = service(ctx)?
            .create_order(OrderDraft {
                customer_id,
                product_ids,
                order_date: input.order_date.map(|DateTime(at)| at),
            })
            .await
            .extend()?;
        Ok(CreateOrderPayload {
            order: OrderNode(order),
        })
    }
}
