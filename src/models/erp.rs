// Canonical ERP model
// Vendor-neutral shapes every adapter produces and consumes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Currency assumed when a vendor does not report one.
pub const DEFAULT_CURRENCY: &str = "UAH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub sku: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brand: String,
    /// шт, кг, л, м
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub barcode: String,
    pub price: f64,
    #[serde(default)]
    pub cost_price: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub currency: String,
    /// VAT percentage (0, 7 or 20 in Ukraine)
    #[serde(default)]
    pub vat_rate: f64,
    pub stock: i64,
    #[serde(default)]
    pub reserved: i64,
    #[serde(default)]
    pub min_stock: i64,
    /// Kilograms
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Centimetres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// An order as reported by (or exported to) an ERP.
///
/// `status` is the vendor's own status string and is never normalized across
/// vendors. Totals are whatever the vendor reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub number: String,
    pub date: Option<DateTime<Utc>>,
    pub status: String,
    pub customer: Option<Customer>,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub discount_reason: String,
    #[serde(default)]
    pub shipping_cost: f64,
    pub total: f64,
    #[serde(default)]
    pub vat_amount: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payment_status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shipping_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tracking_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manager_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warehouse_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build an order with the default currency and everything else zeroed.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub discount: f64,
    pub total: f64,
    #[serde(default)]
    pub vat_rate: f64,
    #[serde(default)]
    pub vat_amount: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warehouse_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    #[default]
    Individual,
    Company,
}

impl CustomerType {
    pub fn as_str(&self) -> &str {
        match self {
            CustomerType::Individual => "individual",
            CustomerType::Company => "company",
        }
    }
}

/// ERP customer / counterparty.
///
/// `edrpou` is the company registry code (ЄДРПОУ), `ipn` the personal tax
/// number (ІПН). Which one is filled depends on `customer_type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    #[serde(rename = "type", default)]
    pub customer_type: CustomerType,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub company_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub edrpou: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ipn: String,
    #[serde(default)]
    pub is_vat_payer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manager_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn is_company(&self) -> bool {
        self.customer_type == CustomerType::Company
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    /// Область
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    pub city: String,
    /// Район
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub district: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub street: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub building: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub apartment: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub number: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub vat_amount: f64,
    pub total: f64,
    pub currency: String,
    /// draft, issued, paid, cancelled
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Income,
    Outcome,
    Transfer,
    Adjustment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub date: DateTime<Utc>,
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warehouse_from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warehouse_to: String,
    /// order, invoice, return
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl StockMovement {
    /// An absolute stock correction for one product in one warehouse.
    pub fn adjustment(product_id: &str, warehouse_id: &str, quantity: i64) -> Self {
        Self {
            id: String::new(),
            external_id: String::new(),
            movement_type: MovementType::Adjustment,
            date: Utc::now(),
            product_id: product_id.to_string(),
            sku: String::new(),
            quantity,
            warehouse_from: String::new(),
            warehouse_to: warehouse_id.to_string(),
            document_type: String::new(),
            document_id: String::new(),
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// Stock of one product in one warehouse.
///
/// Construct through [`ProductStock::new`] so `available` is always
/// `quantity - reserved`. It is not clamped and goes negative when a vendor
/// reports more reserved than on hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductStock {
    pub product_id: String,
    pub sku: String,
    pub warehouse_id: String,
    pub quantity: i64,
    pub reserved: i64,
    pub available: i64,
}

impl ProductStock {
    pub fn new(
        product_id: String,
        sku: String,
        warehouse_id: String,
        quantity: i64,
        reserved: i64,
    ) -> Self {
        Self {
            product_id,
            sku,
            warehouse_id,
            quantity,
            reserved,
            available: quantity - reserved,
        }
    }
}

/// Bookkeeping for one sync pass. Lives only for the duration of the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub entity_type: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub errors: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_list: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncResult {
    pub fn start(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            created: 0,
            updated: 0,
            deleted: 0,
            errors: 0,
            error_list: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.error_list.push(message.into());
    }

    pub fn complete(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_is_quantity_minus_reserved() {
        let stock = ProductStock::new("p1".into(), "SKU".into(), "w1".into(), 10, 3);
        assert_eq!(stock.available, 7);

        let oversold = ProductStock::new("p1".into(), "SKU".into(), "w1".into(), 2, 5);
        assert_eq!(oversold.available, -3);
    }

    #[test]
    fn test_order_defaults_to_uah() {
        let order = Order::new("ORD-001");
        assert_eq!(order.currency, "UAH");
        assert!(order.items.is_empty());
        assert!(order.customer.is_none());
    }

    #[test]
    fn test_customer_type_serialization() {
        let customer = Customer {
            customer_type: CustomerType::Company,
            name: "ТОВ Ромашка".to_string(),
            edrpou: "12345678".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["type"], "company");
        assert_eq!(json["edrpou"], "12345678");
        assert!(json.get("ipn").is_none());
        assert!(customer.is_company());
    }

    #[test]
    fn test_sync_result_lifecycle() {
        let mut result = SyncResult::start("products");
        assert!(result.completed_at.is_none());

        result.record_error("bad row");
        let result = result.complete();

        assert_eq!(result.errors, 1);
        assert_eq!(result.error_list, vec!["bad row".to_string()]);
        assert!(result.completed_at.unwrap() >= result.started_at);
    }

    #[test]
    fn test_stock_adjustment_movement() {
        let movement = StockMovement::adjustment("p1", "w1", 42);
        assert_eq!(movement.movement_type, MovementType::Adjustment);
        assert_eq!(movement.warehouse_to, "w1");

        let json = serde_json::to_value(&movement).unwrap();
        assert_eq!(json["type"], "adjustment");
    }
}
