// ERP Provider Contract
// Shared error taxonomy, provider kinds, and the trait every adapter implements

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::erp::{Customer, Order, Product, ProductStock, Warehouse};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ErpError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("{provider} error {status}: {body}")]
    Api {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{provider} error: {message}")]
    Vendor {
        provider: &'static str,
        message: String,
    },

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ErpError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ErpError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ErpError>;

// ============================================================================
// Provider Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Dilovod,
    OneC,
    Bas,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Dilovod => "dilovod",
            ProviderKind::OneC => "1c",
            ProviderKind::Bas => "bas",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dilovod" => Ok(ProviderKind::Dilovod),
            "1c" => Ok(ProviderKind::OneC),
            "bas" => Ok(ProviderKind::Bas),
            other => Err(ErpError::ProviderNotFound(other.to_string())),
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Contract every ERP adapter satisfies.
///
/// List operations return entities modified after `updated_since` when given,
/// otherwise whatever the vendor's default page returns. Adapters never fail on
/// malformed vendor fields: a missing or mistyped field decodes to its zero
/// value.
#[async_trait]
pub trait ErpProvider: Send + Sync {
    /// Lowercase registry token ("dilovod", "1c", "bas").
    fn name(&self) -> &str;

    // Products
    async fn get_products(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Product>>;
    async fn get_product(&self, id: &str) -> Result<Product>;
    async fn create_product(&self, product: Product) -> Result<Product>;
    async fn update_product(&self, product: &Product) -> Result<()>;
    async fn update_stock(&self, product_id: &str, warehouse_id: &str, quantity: i64) -> Result<()>;

    // Orders
    async fn get_orders(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Order>>;
    async fn get_order(&self, id: &str) -> Result<Order>;
    async fn create_order(&self, order: Order) -> Result<Order>;
    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<()>;

    // Customers
    async fn get_customers(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Customer>>;
    async fn get_customer(&self, id: &str) -> Result<Customer>;
    async fn create_customer(&self, customer: Customer) -> Result<Customer>;
    async fn update_customer(&self, customer: &Customer) -> Result<()>;

    // Stock
    async fn get_stock(&self, warehouse_id: &str) -> Result<Vec<ProductStock>>;
    async fn get_warehouses(&self) -> Result<Vec<Warehouse>>;
}

/// Resolve the vendor id of an order's customer, creating the customer first
/// when it has no external id yet. A failed creation aborts the caller.
///
/// Returns an empty string for orders without a customer.
pub(crate) async fn ensure_customer<P>(provider: &P, customer: Option<&mut Customer>) -> Result<String>
where
    P: ErpProvider + ?Sized,
{
    let Some(customer) = customer else {
        return Ok(String::new());
    };

    if !customer.external_id.is_empty() {
        return Ok(customer.external_id.clone());
    }

    tracing::debug!(provider = provider.name(), "Creating customer before order export");
    let created = provider.create_customer(customer.clone()).await?;
    customer.external_id = created.external_id.clone();

    Ok(created.external_id)
}

/// Fail with `InvalidData` when a vendor accepted a create but returned no id.
pub(crate) fn require_id(provider: &str, entity: &str, id: String) -> Result<String> {
    if id.is_empty() {
        return Err(ErpError::InvalidData(format!(
            "{} returned no identifier for created {}",
            provider, entity
        )));
    }
    Ok(id)
}
