// OData ERP Provider (1C:Enterprise / BAS)
// One schema-mapped adapter parameterized by a per-configuration field table
// Vendor quirks (VAT encoding, customer type, tax ids) live in Dialect hooks

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::erp::{
    Customer, Order, OrderItem, Product, ProductStock, Warehouse, DEFAULT_CURRENCY,
};
use crate::services::erp::lenient::Record;
use crate::services::erp::odata_client::{
    format_datetime, guid_filter, modified_since_filter, parse_datetime, Entity, ODataClient,
};
use crate::services::erp::provider::{ensure_customer, require_id, ErpError, ErpProvider, Result};
use crate::utils::log_sanitizer::mask_secret;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Field names shared by 1C and BAS
const REF_KEY: &str = "Ref_Key";
const SKU: &str = "Артикул";
const STATUS: &str = "Статус";
const PHONE: &str = "Телефон";
const EMAIL: &str = "Email";
const PRODUCT_KEY: &str = "Номенклатура_Key";
const CUSTOMER_KEY: &str = "Контрагент_Key";
const WAREHOUSE_KEY: &str = "Склад_Key";
const CORRECTION_WAREHOUSE: &str = "Склад";
const CORRECTION_PRODUCT: &str = "Номенклатура";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ODataConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Организация / Організація GUID stamped on created documents
    pub organization_ref: String,
    /// Fallback warehouse for stock queries, corrections and new orders
    pub warehouse_ref: String,
    /// Price type used for price lookups; empty disables them
    pub price_type_ref: String,
    pub timeout: Duration,
}

impl ODataConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            organization_ref: String::new(),
            warehouse_ref: String::new(),
            price_type_ref: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ErpError::Config("base_url is required".to_string()));
        }
        if self.username.is_empty() {
            return Err(ErpError::Config("username is required".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Schema & Dialect
// ============================================================================

/// Entity sets and field names of one OData configuration.
#[derive(Debug)]
pub struct Schema {
    pub products: &'static str,
    pub product_select: &'static str,
    pub code: &'static str,
    pub description: &'static str,
    pub weight: &'static str,
    pub modified: &'static str,
    pub is_group: &'static str,
    pub deletion_mark: &'static str,

    pub orders: &'static str,
    pub order_select: &'static str,
    pub number: &'static str,
    pub date: &'static str,
    pub document_total: &'static str,
    pub comment: &'static str,
    pub organization: &'static str,
    pub lines: &'static str,
    pub line_quantity: &'static str,
    pub line_price: &'static str,
    pub line_total: &'static str,

    pub customers: &'static str,
    pub customer_select: &'static str,

    pub stock_balance: &'static str,
    pub stock_quantity: &'static str,
    pub stock_correction: &'static str,

    pub warehouses: &'static str,
    pub warehouse_select: &'static str,

    pub prices: &'static str,
    pub price_type: &'static str,
    pub price: &'static str,
}

/// Vendor-specific behaviour layered over a [`Schema`].
pub trait Dialect: Send + Sync + 'static {
    /// Registry token ("1c", "bas")
    const NAME: &'static str;
    /// Human-readable vendor name for errors
    const LABEL: &'static str;

    fn schema(&self) -> &'static Schema;

    fn product_vat_rate(&self, _record: &Record<'_>) -> f64 {
        0.0
    }

    fn encode_product(&self, _product: &Product, _payload: &mut Map<String, Value>) {}

    fn decode_line(&self, _line: &Record<'_>, _item: &mut OrderItem) {}

    fn encode_line(&self, _item: &OrderItem, _line: &mut Map<String, Value>) {}

    fn encode_order(&self, _order: &Order, _payload: &mut Map<String, Value>) {}

    /// Fill customer type, tax ids and VAT status.
    fn decode_customer(&self, record: &Record<'_>, customer: &mut Customer);

    fn encode_customer(&self, customer: &Customer, payload: &mut Map<String, Value>);

    fn encode_customer_update(&self, _customer: &Customer, _payload: &mut Map<String, Value>) {}
}

// ============================================================================
// OData Provider
// ============================================================================

pub struct ODataProvider<D: Dialect> {
    pub(crate) dialect: D,
    pub(crate) config: ODataConfig,
    pub(crate) odata: Arc<ODataClient>,
}

impl<D: Dialect> ODataProvider<D> {
    pub(crate) fn with_dialect(dialect: D, config: ODataConfig) -> Result<Self> {
        config.validate()?;

        let odata = ODataClient::with_timeout(
            &config.base_url,
            &config.username,
            &config.password,
            config.timeout,
        )?;

        tracing::debug!(
            provider = D::NAME,
            base_url = %odata.base_url(),
            username = %config.username,
            password = %mask_secret(&config.password),
            "OData provider configured"
        );

        Ok(Self {
            dialect,
            config,
            odata: Arc::new(odata),
        })
    }

    /// Underlying protocol client, for entity sets outside the provider contract.
    pub fn odata(&self) -> &Arc<ODataClient> {
        &self.odata
    }

    fn schema(&self) -> &'static Schema {
        self.dialect.schema()
    }

    /// Last price of every product for the configured price type.
    pub async fn get_prices(&self) -> Result<HashMap<String, f64>> {
        let s = self.schema();
        if self.config.price_type_ref.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = guid_filter(s.price_type, &self.config.price_type_ref);
        let select = format!("{},{}", PRODUCT_KEY, s.price);
        let rows = self.odata.get(s.prices, &filter, &select, "").await?;

        Ok(rows
            .iter()
            .map(Record::new)
            .map(|r| (r.string(PRODUCT_KEY), r.f64(s.price)))
            .filter(|(product, _)| !product.is_empty())
            .collect())
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    pub(crate) fn is_tombstone(&self, record: &Record<'_>) -> bool {
        let s = self.schema();
        record.flag(s.deletion_mark) || record.flag(s.is_group)
    }

    pub(crate) fn decode_product(&self, record: &Record<'_>) -> Product {
        let s = self.schema();

        let mut sku = record.string(s.code);
        let article = record.string(SKU);
        if !article.is_empty() {
            sku = article;
        }

        Product {
            external_id: record.string(REF_KEY),
            sku,
            name: record.string(s.description),
            weight: record.f64(s.weight),
            vat_rate: self.dialect.product_vat_rate(record),
            is_active: !record.flag(s.deletion_mark),
            ..Default::default()
        }
    }

    pub(crate) fn decode_order(&self, record: &Record<'_>) -> Order {
        let s = self.schema();

        let customer_ref = record.string(CUSTOMER_KEY);
        let customer = (!customer_ref.is_empty()).then(|| Customer {
            external_id: customer_ref,
            ..Default::default()
        });

        let items = record
            .children(s.lines)
            .iter()
            .map(|line| {
                let mut item = OrderItem {
                    external_id: line.string(PRODUCT_KEY),
                    quantity: line.i64(s.line_quantity),
                    price: line.f64(s.line_price),
                    total: line.f64(s.line_total),
                    ..Default::default()
                };
                self.dialect.decode_line(line, &mut item);
                item
            })
            .collect();

        Order {
            external_id: record.string(REF_KEY),
            number: record.string(s.number),
            date: parse_datetime(record.raw(s.date)),
            status: record.string(STATUS),
            notes: record.string(s.comment),
            warehouse_id: record.string(WAREHOUSE_KEY),
            total: record.f64(s.document_total),
            currency: DEFAULT_CURRENCY.to_string(),
            customer,
            items,
            ..Default::default()
        }
    }

    pub(crate) fn decode_customer(&self, record: &Record<'_>) -> Customer {
        let s = self.schema();

        let mut customer = Customer {
            external_id: record.string(REF_KEY),
            name: record.string(s.description),
            phone: record.string(PHONE),
            email: record.string(EMAIL),
            ..Default::default()
        };
        self.dialect.decode_customer(record, &mut customer);
        customer
    }

    pub(crate) fn decode_warehouse(&self, record: &Record<'_>) -> Warehouse {
        let s = self.schema();

        Warehouse {
            external_id: record.string(REF_KEY),
            code: record.string(s.code),
            name: record.string(s.description),
            is_active: !record.flag(s.deletion_mark),
            ..Default::default()
        }
    }

    /// The balance register already reports availability; nothing is reserved.
    pub(crate) fn decode_stock(&self, record: &Record<'_>, warehouse_id: &str) -> ProductStock {
        let s = self.schema();

        let mut warehouse = record.string(WAREHOUSE_KEY);
        if warehouse.is_empty() {
            warehouse = warehouse_id.to_string();
        }

        ProductStock::new(
            record.string(PRODUCT_KEY),
            String::new(),
            warehouse,
            record.i64(s.stock_quantity),
            0,
        )
    }

    // ========================================================================
    // Price & stock lookups
    // ========================================================================

    async fn product_price(&self, product_ref: &str) -> Result<f64> {
        let s = self.schema();
        if self.config.price_type_ref.is_empty() {
            return Ok(0.0);
        }

        let filter = format!(
            "{} and {}",
            guid_filter(PRODUCT_KEY, product_ref),
            guid_filter(s.price_type, &self.config.price_type_ref)
        );
        let rows = self.odata.get(s.prices, &filter, s.price, "").await?;

        Ok(rows
            .first()
            .map(|row| Record::new(row).f64(s.price))
            .unwrap_or(0.0))
    }

    async fn product_stock(&self, product_ref: &str) -> Result<i64> {
        let s = self.schema();

        let mut filter = guid_filter(PRODUCT_KEY, product_ref);
        if !self.config.warehouse_ref.is_empty() {
            filter.push_str(" and ");
            filter.push_str(&guid_filter(WAREHOUSE_KEY, &self.config.warehouse_ref));
        }

        let rows = self
            .odata
            .get(s.stock_balance, &filter, s.stock_quantity, "")
            .await?;

        Ok(rows
            .iter()
            .map(|row| Record::new(row).i64(s.stock_quantity))
            .sum())
    }

    /// Price and stock live in registers; a failed lookup leaves the zero value.
    async fn enrich(&self, product: &mut Product) {
        match self.product_price(&product.external_id).await {
            Ok(price) => product.price = price,
            Err(e) => tracing::warn!(
                provider = D::NAME,
                product = %product.external_id,
                "Price lookup failed: {}", e
            ),
        }

        match self.product_stock(&product.external_id).await {
            Ok(stock) => product.stock = stock,
            Err(e) => tracing::warn!(
                provider = D::NAME,
                product = %product.external_id,
                "Stock lookup failed: {}", e
            ),
        }
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    pub(crate) fn listing_filter(&self, updated_since: Option<DateTime<Utc>>) -> String {
        let s = self.schema();
        let mut filter = format!("{} eq false", s.is_group);
        if let Some(since) = updated_since {
            filter.push_str(" and ");
            filter.push_str(&modified_since_filter(s.modified, since));
        }
        filter
    }

    fn warehouse_or_default<'a>(&'a self, warehouse_id: &'a str) -> &'a str {
        if warehouse_id.is_empty() {
            &self.config.warehouse_ref
        } else {
            warehouse_id
        }
    }

    fn created_ref(&self, entity: &str, created: Option<Entity>) -> Result<String> {
        let id = created
            .as_ref()
            .map(|e| Record::new(e).string(REF_KEY))
            .unwrap_or_default();
        require_id(D::LABEL, entity, id)
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

#[async_trait]
impl<D: Dialect> ErpProvider for ODataProvider<D> {
    fn name(&self) -> &str {
        D::NAME
    }

    async fn get_products(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Product>> {
        let s = self.schema();
        let rows = self
            .odata
            .get(s.products, &self.listing_filter(updated_since), s.product_select, "")
            .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = Record::new(row);
            if self.is_tombstone(&record) {
                continue;
            }

            let mut product = self.decode_product(&record);
            self.enrich(&mut product).await;
            products.push(product);
        }

        Ok(products)
    }

    async fn get_product(&self, id: &str) -> Result<Product> {
        let s = self.schema();
        let row = self.odata.get_by_id(s.products, id).await?;

        let mut product = self.decode_product(&Record::new(&row));
        self.enrich(&mut product).await;
        Ok(product)
    }

    async fn create_product(&self, mut product: Product) -> Result<Product> {
        let s = self.schema();

        let mut payload = Map::new();
        payload.insert(s.code.into(), json!(product.sku));
        payload.insert(s.description.into(), json!(product.name));
        payload.insert(SKU.into(), json!(product.sku));
        payload.insert(s.is_group.into(), json!(false));
        self.dialect.encode_product(&product, &mut payload);

        let created = self.odata.create(s.products, &Value::Object(payload)).await?;
        product.external_id = self.created_ref("product", created)?;
        Ok(product)
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let s = self.schema();

        let mut payload = Map::new();
        payload.insert(s.description.into(), json!(product.name));
        payload.insert(SKU.into(), json!(product.sku));

        self.odata
            .update(s.products, &product.external_id, &Value::Object(payload))
            .await
    }

    /// Posts a stock correction document; stock registers are never written directly.
    async fn update_stock(&self, product_id: &str, warehouse_id: &str, quantity: i64) -> Result<()> {
        let s = self.schema();

        let mut line = Map::new();
        line.insert(CORRECTION_PRODUCT.into(), json!(product_id));
        line.insert(s.line_quantity.into(), json!(quantity));

        let mut payload = Map::new();
        payload.insert(s.date.into(), json!(format_datetime(Utc::now())));
        payload.insert(s.organization.into(), json!(self.config.organization_ref));
        payload.insert(
            CORRECTION_WAREHOUSE.into(),
            json!(self.warehouse_or_default(warehouse_id)),
        );
        payload.insert(s.lines.into(), Value::Array(vec![Value::Object(line)]));

        self.odata
            .create(s.stock_correction, &Value::Object(payload))
            .await?;
        Ok(())
    }

    async fn get_orders(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Order>> {
        let s = self.schema();
        let filter = updated_since
            .map(|since| modified_since_filter(s.date, since))
            .unwrap_or_default();

        let rows = self
            .odata
            .get(s.orders, &filter, s.order_select, s.lines)
            .await?;

        Ok(rows
            .iter()
            .map(Record::new)
            .filter(|record| !record.flag(s.deletion_mark))
            .map(|record| self.decode_order(&record))
            .collect())
    }

    async fn get_order(&self, id: &str) -> Result<Order> {
        let s = self.schema();
        let row = self.odata.get_by_id(s.orders, id).await?;
        Ok(self.decode_order(&Record::new(&row)))
    }

    async fn create_order(&self, mut order: Order) -> Result<Order> {
        let s = self.schema();
        let customer_ref = ensure_customer(self, order.customer.as_mut()).await?;

        let lines: Vec<Value> = order
            .items
            .iter()
            .map(|item| {
                let mut line = Map::new();
                line.insert(PRODUCT_KEY.into(), json!(item.external_id));
                line.insert(s.line_quantity.into(), json!(item.quantity));
                line.insert(s.line_price.into(), json!(item.price));
                line.insert(s.line_total.into(), json!(item.total));
                self.dialect.encode_line(item, &mut line);
                Value::Object(line)
            })
            .collect();

        let warehouse = if order.warehouse_id.is_empty() {
            self.config.warehouse_ref.clone()
        } else {
            order.warehouse_id.clone()
        };

        let mut payload = Map::new();
        payload.insert(
            s.date.into(),
            json!(format_datetime(order.date.unwrap_or_else(Utc::now))),
        );
        payload.insert(s.number.into(), json!(order.number));
        payload.insert(s.organization.into(), json!(self.config.organization_ref));
        payload.insert(CUSTOMER_KEY.into(), json!(customer_ref));
        payload.insert(WAREHOUSE_KEY.into(), json!(warehouse));
        payload.insert(s.document_total.into(), json!(order.total));
        payload.insert(s.comment.into(), json!(order.notes));
        payload.insert(s.lines.into(), Value::Array(lines));
        self.dialect.encode_order(&order, &mut payload);

        let created = self.odata.create(s.orders, &Value::Object(payload)).await?;
        order.external_id = self.created_ref("order", created)?;
        Ok(order)
    }

    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<()> {
        let s = self.schema();

        let mut payload = Map::new();
        payload.insert(STATUS.into(), json!(status));

        self.odata
            .update(s.orders, order_id, &Value::Object(payload))
            .await
    }

    async fn get_customers(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<Customer>> {
        let s = self.schema();
        let rows = self
            .odata
            .get(s.customers, &self.listing_filter(updated_since), s.customer_select, "")
            .await?;

        Ok(rows
            .iter()
            .map(Record::new)
            .filter(|record| !self.is_tombstone(record))
            .map(|record| self.decode_customer(&record))
            .collect())
    }

    async fn get_customer(&self, id: &str) -> Result<Customer> {
        let s = self.schema();
        let row = self.odata.get_by_id(s.customers, id).await?;
        Ok(self.decode_customer(&Record::new(&row)))
    }

    async fn create_customer(&self, mut customer: Customer) -> Result<Customer> {
        let s = self.schema();

        let mut payload = Map::new();
        payload.insert(s.description.into(), json!(customer.name));
        payload.insert(PHONE.into(), json!(customer.phone));
        payload.insert(EMAIL.into(), json!(customer.email));
        payload.insert(s.is_group.into(), json!(false));
        self.dialect.encode_customer(&customer, &mut payload);

        let created = self
            .odata
            .create(s.customers, &Value::Object(payload))
            .await?;
        customer.external_id = self.created_ref("customer", created)?;
        Ok(customer)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let s = self.schema();

        let mut payload = Map::new();
        payload.insert(s.description.into(), json!(customer.name));
        payload.insert(PHONE.into(), json!(customer.phone));
        payload.insert(EMAIL.into(), json!(customer.email));
        self.dialect.encode_customer_update(customer, &mut payload);

        self.odata
            .update(s.customers, &customer.external_id, &Value::Object(payload))
            .await
    }

    async fn get_stock(&self, warehouse_id: &str) -> Result<Vec<ProductStock>> {
        let s = self.schema();
        let warehouse = self.warehouse_or_default(warehouse_id);

        let filter = if warehouse.is_empty() {
            String::new()
        } else {
            guid_filter(WAREHOUSE_KEY, warehouse)
        };
        let select = format!("{},{},{}", PRODUCT_KEY, WAREHOUSE_KEY, s.stock_quantity);

        let rows = self.odata.get(s.stock_balance, &filter, &select, "").await?;

        Ok(rows
            .iter()
            .map(|row| self.decode_stock(&Record::new(row), warehouse))
            .collect())
    }

    async fn get_warehouses(&self) -> Result<Vec<Warehouse>> {
        let s = self.schema();
        let filter = format!("{} eq false", s.deletion_mark);

        let rows = self
            .odata
            .get(s.warehouses, &filter, s.warehouse_select, "")
            .await?;

        Ok(rows
            .iter()
            .map(Record::new)
            .filter(|record| !record.flag(s.deletion_mark))
            .map(|record| self.decode_warehouse(&record))
            .collect())
    }
}
