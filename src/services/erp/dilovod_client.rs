// Dilovod Cloud ERP Client
// JSON REST API with bearer-token auth scoped to one company (X-Company-ID)
// Flat snake_case wire schema mapped 1:1 onto the canonical model

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use url::Url;

use crate::models::erp::{
    Address, Customer, CustomerType, Invoice, Order, OrderItem, Product, ProductStock,
    StockMovement, Warehouse, DEFAULT_CURRENCY,
};
use crate::services::erp::lenient;
use crate::services::erp::metrics;
use crate::services::erp::odata_client::parse_datetime_str;
use crate::services::erp::provider::{ensure_customer, require_id, ErpError, ErpProvider, Result};
use crate::utils::log_sanitizer::{mask_secret, sanitize_for_log};

pub const DILOVOD_API_URL: &str = "https://dilovod.com/api/v1";

const PROVIDER: &str = "Dilovod";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for product/order/customer listings
const LIST_LIMIT: u32 = 1000;
/// Page size for stock listings
const STOCK_LIMIT: u32 = 10000;

const DATE_FORMAT: &str = "%Y-%m-%d";
const MODIFIED_AFTER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct DilovodConfig {
    pub api_key: String,
    pub company_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl DilovodConfig {
    pub fn new(api_key: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            company_id: company_id.into(),
            base_url: DILOVOD_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ErpError::Config("api_key is required".to_string()));
        }
        if self.company_id.is_empty() {
            return Err(ErpError::Config("company_id is required".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(ErpError::Config("base_url is required".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Wire Models
// ============================================================================

#[derive(Debug, Deserialize)]
struct DilovodProduct {
    #[serde(default, deserialize_with = "lenient::id")]
    id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    sku: String,
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    barcode: String,
    #[serde(default, deserialize_with = "lenient::string")]
    unit: String,
    #[serde(default, deserialize_with = "lenient::f64")]
    price: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    cost_price: f64,
    #[serde(default, deserialize_with = "lenient::i64")]
    stock: i64,
    #[serde(default, deserialize_with = "lenient::f64")]
    vat_rate: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    weight: f64,
    #[serde(default, deserialize_with = "lenient::nested_name")]
    category: String,
    #[serde(default = "lenient::yes", deserialize_with = "lenient::flag_unless_false")]
    is_active: bool,
}

impl From<DilovodProduct> for Product {
    fn from(wire: DilovodProduct) -> Self {
        Product {
            external_id: wire.id,
            sku: wire.sku,
            name: wire.name,
            barcode: wire.barcode,
            unit: wire.unit,
            price: wire.price,
            cost_price: wire.cost_price,
            stock: wire.stock,
            vat_rate: wire.vat_rate,
            weight: wire.weight,
            category: wire.category,
            is_active: wire.is_active,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct DilovodCustomer {
    #[serde(default, deserialize_with = "lenient::id")]
    id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    phone: String,
    #[serde(default, deserialize_with = "lenient::string")]
    email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    edrpou: String,
    #[serde(default, deserialize_with = "lenient::string")]
    ipn: String,
    #[serde(default, deserialize_with = "lenient::string")]
    company_name: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    is_vat_payer: bool,
}

impl From<DilovodCustomer> for Customer {
    fn from(wire: DilovodCustomer) -> Self {
        let customer_type = if !wire.edrpou.is_empty() || !wire.company_name.is_empty() {
            CustomerType::Company
        } else {
            CustomerType::Individual
        };

        Customer {
            external_id: wire.id,
            customer_type,
            name: wire.name,
            phone: wire.phone,
            email: wire.email,
            edrpou: wire.edrpou,
            ipn: wire.ipn,
            company_name: wire.company_name,
            is_vat_payer: wire.is_vat_payer,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct DilovodOrderItem {
    #[serde(default, deserialize_with = "lenient::id")]
    product_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    sku: String,
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(default, deserialize_with = "lenient::i64")]
    quantity: i64,
    #[serde(default, deserialize_with = "lenient::f64")]
    price: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    discount: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    total: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    vat_rate: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    vat_amount: f64,
}

impl From<DilovodOrderItem> for OrderItem {
    fn from(wire: DilovodOrderItem) -> Self {
        OrderItem {
            external_id: wire.product_id,
            sku: wire.sku,
            name: wire.name,
            quantity: wire.quantity,
            price: wire.price,
            discount: wire.discount,
            total: wire.total,
            vat_rate: wire.vat_rate,
            vat_amount: wire.vat_amount,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct DilovodOrder {
    #[serde(default, deserialize_with = "lenient::id")]
    id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    number: String,
    #[serde(default, deserialize_with = "lenient::string")]
    date: String,
    #[serde(default, deserialize_with = "lenient::string")]
    status: String,
    #[serde(default, deserialize_with = "lenient::string")]
    payment_status: String,
    #[serde(default, deserialize_with = "lenient::string")]
    notes: String,
    #[serde(default, deserialize_with = "lenient::f64")]
    total: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    subtotal: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    discount: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    shipping_cost: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    vat_amount: f64,
    #[serde(default, deserialize_with = "lenient::object")]
    customer: Option<DilovodCustomer>,
    #[serde(default, deserialize_with = "lenient::list")]
    items: Vec<DilovodOrderItem>,
}

impl From<DilovodOrder> for Order {
    fn from(wire: DilovodOrder) -> Self {
        Order {
            external_id: wire.id,
            number: wire.number,
            date: parse_datetime_str(&wire.date),
            status: wire.status,
            payment_status: wire.payment_status,
            notes: wire.notes,
            total: wire.total,
            subtotal: wire.subtotal,
            discount: wire.discount,
            shipping_cost: wire.shipping_cost,
            vat_amount: wire.vat_amount,
            currency: DEFAULT_CURRENCY.to_string(),
            customer: wire.customer.map(Customer::from),
            items: wire.items.into_iter().map(OrderItem::from).collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct DilovodStock {
    #[serde(default, deserialize_with = "lenient::id")]
    product_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    sku: String,
    #[serde(default, deserialize_with = "lenient::id")]
    warehouse_id: String,
    #[serde(default, deserialize_with = "lenient::i64")]
    quantity: i64,
    #[serde(default, deserialize_with = "lenient::i64")]
    reserved: i64,
}

impl From<DilovodStock> for ProductStock {
    fn from(wire: DilovodStock) -> Self {
        ProductStock::new(
            wire.product_id,
            wire.sku,
            wire.warehouse_id,
            wire.quantity,
            wire.reserved,
        )
    }
}

#[derive(Debug, Deserialize)]
struct DilovodWarehouse {
    #[serde(default, deserialize_with = "lenient::id")]
    id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    code: String,
    #[serde(default = "lenient::yes", deserialize_with = "lenient::flag_unless_false")]
    is_active: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    is_default: bool,
}

impl From<DilovodWarehouse> for Warehouse {
    fn from(wire: DilovodWarehouse) -> Self {
        Warehouse {
            external_id: wire.id,
            name: wire.name,
            code: wire.code,
            is_active: wire.is_active,
            is_default: wire.is_default,
            ..Default::default()
        }
    }
}

// ============================================================================
// Dilovod Client
// ============================================================================

pub struct DilovodClient {
    config: DilovodConfig,
    base_url: Url,
    http_client: Client,
}

impl DilovodClient {
    pub fn new(config: DilovodConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ErpError::Config(format!("invalid Dilovod base_url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ErpError::Config(format!(
                "invalid Dilovod base_url: {}",
                config.base_url
            )));
        }

        let http_client = Client::builder().timeout(config.timeout).build()?;

        tracing::debug!(
            company_id = %config.company_id,
            api_key = %mask_secret(&config.api_key),
            "Dilovod client configured"
        );

        Ok(Self {
            config,
            base_url,
            http_client,
        })
    }

    // ========================================================================
    // Documents outside the provider contract
    // ========================================================================

    /// Create an invoice, optionally linked to an order.
    pub async fn create_invoice(&self, mut invoice: Invoice) -> Result<Invoice> {
        let items: Vec<Value> = invoice
            .items
            .iter()
            .map(|item| {
                json!({
                    "product_id": item.external_id,
                    "quantity": item.quantity,
                    "price": item.price,
                    "vat_rate": item.vat_rate,
                })
            })
            .collect();

        let mut payload = json!({
            "number": invoice.number,
            "date": format_date(invoice.date),
            "customer_id": invoice.customer_id,
            "items": items,
            "currency": invoice.currency,
        });
        if !invoice.order_id.is_empty() {
            payload["order_id"] = json!(invoice.order_id);
        }
        if let Some(due_date) = invoice.due_date {
            payload["due_date"] = json!(due_date.format(DATE_FORMAT).to_string());
        }

        let data = self.post(&["invoices"], &payload).await?;
        invoice.external_id = require_id(PROVIDER, "invoice", data_id(&data))?;
        Ok(invoice)
    }

    pub async fn create_payment(&self, invoice_id: &str, amount: f64, payment_method: &str) -> Result<()> {
        let payload = json!({
            "invoice_id": invoice_id,
            "amount": amount,
            "date": Utc::now().format(DATE_FORMAT).to_string(),
            "payment_method": payment_method,
        });

        self.post(&["payments"], &payload).await?;
        Ok(())
    }

    /// Fetch a report. Returns an empty object when Dilovod has no data.
    pub async fn get_reports(
        &self,
        report_type: &str,
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
    ) -> Result<Map<String, Value>> {
        let query = [
            ("type", report_type.to_string()),
            ("date_from", date_from.format(DATE_FORMAT).to_string()),
            ("date_to", date_to.format(DATE_FORMAT).to_string()),
        ];

        match self.get(&["reports"], &query).await? {
            Value::Object(report) => Ok(report),
            _ => Ok(Map::new()),
        }
    }

    // ========================================================================
    // HTTP Helpers
    // ========================================================================

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ErpError::Config("Dilovod base_url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value> {
        let mut url = self.url(segments)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        self.request(Method::GET, url, None).await
    }

    async fn post(&self, segments: &[&str], payload: &Value) -> Result<Value> {
        let url = self.url(segments)?;
        self.request(Method::POST, url, Some(payload)).await
    }

    async fn put(&self, segments: &[&str], payload: &Value) -> Result<Value> {
        let url = self.url(segments)?;
        self.request(Method::PUT, url, Some(payload)).await
    }

    /// Fetch one entity by id; a missing or non-object `data` is NotFound.
    async fn get_one(&self, collection: &str, id: &str) -> Result<Value> {
        if id.is_empty() {
            return Err(ErpError::NotFound(format!("{}/<empty id>", collection)));
        }

        match self.get(&[collection, id], &[]).await? {
            Value::Object(map) if !map.is_empty() => Ok(Value::Object(map)),
            _ => Err(ErpError::NotFound(format!("{}/{}", collection, id))),
        }
    }

    /// Send a request and return the envelope's `data` member (`Null` when absent).
    async fn request(&self, method: Method, url: Url, payload: Option<&Value>) -> Result<Value> {
        let started = Instant::now();

        let mut request = self
            .http_client
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header("X-Company-ID", &self.config.company_id)
            .header(ACCEPT, "application/json");

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_request(PROVIDER, method.as_str(), None, started.elapsed());
                tracing::warn!(%method, path = url.path(), "Dilovod transport failure: {}", e);
                return Err(e.into());
            }
        };

        let status = response.status();
        metrics::record_request(PROVIDER, method.as_str(), Some(status.as_u16()), started.elapsed());

        let body = response.text().await?;
        tracing::debug!(
            %method,
            path = url.path(),
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dilovod request completed"
        );

        if status.as_u16() >= 400 {
            tracing::warn!(%status, body = %sanitize_for_log(&body), "Dilovod request failed");
            return Err(match status {
                StatusCode::NOT_FOUND => ErpError::NotFound(body),
                _ => ErpError::Api {
                    provider: PROVIDER,
                    status,
                    body,
                },
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let envelope: Value = serde_json::from_str(&body)?;
        if let Some(message) = envelope_error(&envelope) {
            tracing::warn!(error = %sanitize_for_log(&message), "Dilovod rejected request");
            return Err(ErpError::Vendor {
                provider: PROVIDER,
                message,
            });
        }

        Ok(match envelope {
            Value::Object(mut root) => root.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }
}

/// Business errors reported inside a 2xx envelope: `"error": "..."` or
/// `"errors": ["...", {"message": "..."}]`.
fn envelope_error(envelope: &Value) -> Option<String> {
    if let Some(message) = envelope.get("error").and_then(Value::as_str) {
        if !message.is_empty() {
            return Some(message.to_string());
        }
    }

    let messages: Vec<String> = envelope
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| match e {
                    Value::String(s) => Some(s.clone()),
                    other => other
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
                .filter(|m| !m.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

fn data_id(data: &Value) -> String {
    match data.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.unwrap_or_else(Utc::now).format(DATE_FORMAT).to_string()
}

fn listing_query(limit: u32, updated_since: Option<DateTime<Utc>>) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(since) = updated_since {
        query.push(("modified_after", since.format(MODIFIED_AFTER_FORMAT).to_string()));
    }
    query
}

fn customer_payload(customer: &Customer) -> Value {
    let mut payload = json!({
        "name": customer.name,
        "phone": customer.phone,
        "email": customer.email,
    });

    if customer.is_company() {
        payload["company_name"] = json!(customer.company_name);
        payload["edrpou"] = json!(customer.edrpou);
        payload["is_vat_payer"] = json!(customer.is_vat_payer);
    } else if !customer.ipn.is_empty() {
        payload["ipn"] = json!(customer.ipn);
    }

    if let Some(address) = &customer.address {
        payload["address"] = address_payload(address);
    }

    payload
}

fn address_payload(address: &Address) -> Value {
    json!({
        "city": address.city,
        "street": address.street,
        "postal_code": address.postal_code,
    })
}

// ============================================================================
// Provider Implementation
// ============================================================================

#[async_trait]
impl ErpProvider for DilovodClient {
    fn name(&self) -> &str {
        "dilovod"
    }

    async fn get_products(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Product>> {
        let data = self
            .get(&["products"], &listing_query(LIST_LIMIT, updated_since))
            .await?;

        Ok(lenient::decode_list::<DilovodProduct>(data)
            .into_iter()
            .map(Product::from)
            .collect())
    }

    async fn get_product(&self, id: &str) -> Result<Product> {
        let data = self.get_one("products", id).await?;
        let wire: DilovodProduct = serde_json::from_value(data)?;
        Ok(wire.into())
    }

    async fn create_product(&self, mut product: Product) -> Result<Product> {
        let mut payload = json!({
            "name": product.name,
            "sku": product.sku,
            "barcode": product.barcode,
            "price": product.price,
            "unit": product.unit,
            "vat_rate": product.vat_rate,
        });
        if product.weight > 0.0 {
            payload["weight"] = json!(product.weight);
        }
        if !product.category.is_empty() {
            payload["category_name"] = json!(product.category);
        }

        let data = self.post(&["products"], &payload).await?;
        product.external_id = require_id(PROVIDER, "product", data_id(&data))?;
        Ok(product)
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        if product.external_id.is_empty() {
            return Err(ErpError::NotFound("products/<empty id>".to_string()));
        }

        let payload = json!({
            "name": product.name,
            "sku": product.sku,
            "barcode": product.barcode,
            "price": product.price,
        });

        self.put(&["products", &product.external_id], &payload).await?;
        Ok(())
    }

    async fn update_stock(&self, product_id: &str, warehouse_id: &str, quantity: i64) -> Result<()> {
        let movement = StockMovement::adjustment(product_id, warehouse_id, quantity);

        let payload = json!({
            "product_id": movement.product_id,
            "warehouse_id": movement.warehouse_to,
            "quantity": movement.quantity,
            "type": movement.movement_type,
            "date": movement.date.format(DATE_FORMAT).to_string(),
        });

        self.post(&["stock", "movements"], &payload).await?;
        Ok(())
    }

    async fn get_orders(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Order>> {
        let data = self
            .get(&["orders"], &listing_query(LIST_LIMIT, updated_since))
            .await?;

        Ok(lenient::decode_list::<DilovodOrder>(data)
            .into_iter()
            .map(Order::from)
            .collect())
    }

    async fn get_order(&self, id: &str) -> Result<Order> {
        let data = self.get_one("orders", id).await?;
        let wire: DilovodOrder = serde_json::from_value(data)?;
        Ok(wire.into())
    }

    async fn create_order(&self, mut order: Order) -> Result<Order> {
        let customer_id = ensure_customer(self, order.customer.as_mut()).await?;

        let items: Vec<Value> = order
            .items
            .iter()
            .map(|item| {
                let mut line = json!({
                    "product_id": item.external_id,
                    "quantity": item.quantity,
                    "price": item.price,
                });
                if item.discount > 0.0 {
                    line["discount"] = json!(item.discount);
                }
                line
            })
            .collect();

        let mut payload = json!({
            "number": order.number,
            "date": format_date(order.date),
            "customer_id": customer_id,
            "items": items,
            "notes": order.notes,
        });
        if order.discount > 0.0 {
            payload["discount"] = json!(order.discount);
        }
        if order.shipping_cost > 0.0 {
            payload["shipping_cost"] = json!(order.shipping_cost);
        }

        let data = self.post(&["orders"], &payload).await?;
        order.external_id = require_id(PROVIDER, "order", data_id(&data))?;
        Ok(order)
    }

    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<()> {
        if order_id.is_empty() {
            return Err(ErpError::NotFound("orders/<empty id>".to_string()));
        }

        self.put(&["orders", order_id], &json!({ "status": status }))
            .await?;
        Ok(())
    }

    async fn get_customers(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Customer>> {
        let data = self
            .get(&["customers"], &listing_query(LIST_LIMIT, updated_since))
            .await?;

        Ok(lenient::decode_list::<DilovodCustomer>(data)
            .into_iter()
            .map(Customer::from)
            .collect())
    }

    async fn get_customer(&self, id: &str) -> Result<Customer> {
        let data = self.get_one("customers", id).await?;
        let wire: DilovodCustomer = serde_json::from_value(data)?;
        Ok(wire.into())
    }

    async fn create_customer(&self, mut customer: Customer) -> Result<Customer> {
        let data = self
            .post(&["customers"], &customer_payload(&customer))
            .await?;
        customer.external_id = require_id(PROVIDER, "customer", data_id(&data))?;
        Ok(customer)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        if customer.external_id.is_empty() {
            return Err(ErpError::NotFound("customers/<empty id>".to_string()));
        }

        let mut payload = json!({
            "name": customer.name,
            "phone": customer.phone,
            "email": customer.email,
        });
        if !customer.edrpou.is_empty() {
            payload["edrpou"] = json!(customer.edrpou);
        }
        if !customer.ipn.is_empty() {
            payload["ipn"] = json!(customer.ipn);
        }

        self.put(&["customers", &customer.external_id], &payload)
            .await?;
        Ok(())
    }

    async fn get_stock(&self, warehouse_id: &str) -> Result<Vec<ProductStock>> {
        let mut query = vec![("limit", STOCK_LIMIT.to_string())];
        if !warehouse_id.is_empty() {
            query.push(("warehouse_id", warehouse_id.to_string()));
        }

        let data = self.get(&["stock"], &query).await?;

        Ok(lenient::decode_list::<DilovodStock>(data)
            .into_iter()
            .map(ProductStock::from)
            .collect())
    }

    async fn get_warehouses(&self) -> Result<Vec<Warehouse>> {
        let data = self.get(&["warehouses"], &[]).await?;

        Ok(lenient::decode_list::<DilovodWarehouse>(data)
            .into_iter()
            .map(Warehouse::from)
            .collect())
    }
}
