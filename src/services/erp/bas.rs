// BAS adapter (BAS Управління торгівлею / BAS ERP)
// Ukrainian-localized 1C descendant: discrete VAT codes (ПДВ20, ПДВ7, БезПДВ),
// separate ЄДРПОУ/ІПН fields, plus sales invoices and payment documents

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::models::erp::{Customer, CustomerType, Invoice, Order, OrderItem, Product, DEFAULT_CURRENCY};
use crate::services::erp::lenient::Record;
use crate::services::erp::odata_client::format_datetime;
use crate::services::erp::odata_provider::{Dialect, ODataConfig, ODataProvider, Schema};
use crate::services::erp::provider::{require_id, Result};

const VAT_CODE: &str = "СтавкаПДВ";
const VAT_AMOUNT: &str = "СумаПДВ";
const CURRENCY: &str = "Валюта";
const COUNTERPARTY_TYPE: &str = "ТипКонтрагента";
const LEGAL_ENTITY: &str = "ЮридичнаОсоба";
const NATURAL_PERSON: &str = "ФізичнаОсоба";
const EDRPOU: &str = "ЄДРПОУ";
const IPN: &str = "ІПН";
const VAT_PAYER: &str = "ПлатникПДВ";

const SALES_INVOICE: &str = "Document_ВидатковаНакладна";
const CASH_RECEIPT: &str = "Document_ПрибутковийКасовийОрдер";
const PAYMENT_ORDER: &str = "Document_ПлатіжнеДоручення";

/// Rate applied to exported lines that carry none.
pub const DEFAULT_VAT_RATE: f64 = 20.0;

pub type BasClient = ODataProvider<Bas>;

static BAS_SCHEMA: Schema = Schema {
    products: "Catalog_Номенклатура",
    product_select: "Ref_Key,Код,Найменування,Артикул,ОдиницяВиміру_Key,ВидНоменклатури,НоменклатурнаГрупа,Виробник,Вага,ПозначкаВидалення,СтавкаПДВ,ЕтоГрупа",
    code: "Код",
    description: "Найменування",
    weight: "Вага",
    modified: "ДатаЗміни",
    is_group: "ЕтоГрупа",
    deletion_mark: "ПозначкаВидалення",

    orders: "Document_ЗамовленняКлієнта",
    order_select: "Ref_Key,Номер,Дата,Контрагент_Key,СумаДокумента,Статус,Склад_Key,Коментар,ПозначкаВидалення",
    number: "Номер",
    date: "Дата",
    document_total: "СумаДокумента",
    comment: "Коментар",
    organization: "Організація",
    lines: "Товари",
    line_quantity: "Кількість",
    line_price: "Ціна",
    line_total: "Сума",

    customers: "Catalog_Контрагенти",
    customer_select: "Ref_Key,Код,Найменування,ЄДРПОУ,ІПН,Телефон,Email,ПозначкаВидалення,ТипКонтрагента,ПлатникПДВ,ЕтоГрупа",

    stock_balance: "AccumulationRegister_ЗалишкиТоварів/Balance",
    stock_quantity: "КількістьЗалишок",
    stock_correction: "Document_КоригуванняЗалишків",

    warehouses: "Catalog_Склади",
    warehouse_select: "Ref_Key,Код,Найменування",

    prices: "InformationRegister_ЦіниНоменклатури/SliceLast",
    price_type: "ТипЦін_Key",
    price: "Ціна",
};

// ============================================================================
// VAT codes
// ============================================================================

/// `ПДВ20` → 20, `ПДВ7` → 7, anything else → 0.
pub fn vat_rate_from_code(code: &str) -> f64 {
    match code {
        "ПДВ20" => 20.0,
        "ПДВ7" => 7.0,
        _ => 0.0,
    }
}

/// Nearest code at or below the rate.
pub fn vat_code(rate: f64) -> &'static str {
    if rate >= 20.0 {
        "ПДВ20"
    } else if rate >= 7.0 {
        "ПДВ7"
    } else {
        "БезПДВ"
    }
}

/// VAT contained in a tax-inclusive amount.
pub fn vat_included(total: f64, rate: f64) -> f64 {
    total * rate / (100.0 + rate)
}

fn effective_rate(rate: f64) -> f64 {
    if rate == 0.0 {
        DEFAULT_VAT_RATE
    } else {
        rate
    }
}

/// Line VAT may arrive as a code or as a bare percentage.
fn decode_vat(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::String(code)) => vat_rate_from_code(code),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct BasConfig {
    pub odata: ODataConfig,
    /// Каса used for cash receipts
    pub cash_account_ref: String,
    /// Банківський рахунок used for card and bank payments
    pub bank_account_ref: String,
    /// Шаблон договору for new counterparties
    pub contract_template: String,
}

impl BasConfig {
    pub fn new(odata: ODataConfig) -> Self {
        Self {
            odata,
            cash_account_ref: String::new(),
            bank_account_ref: String::new(),
            contract_template: String::new(),
        }
    }
}

// ============================================================================
// Dialect
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Bas {
    pub cash_account_ref: String,
    pub bank_account_ref: String,
    pub contract_template: String,
}

impl Dialect for Bas {
    const NAME: &'static str = "bas";
    const LABEL: &'static str = "BAS";

    fn schema(&self) -> &'static Schema {
        &BAS_SCHEMA
    }

    fn product_vat_rate(&self, record: &Record<'_>) -> f64 {
        vat_rate_from_code(&record.string(VAT_CODE))
    }

    fn encode_product(&self, product: &Product, payload: &mut Map<String, Value>) {
        payload.insert(VAT_CODE.into(), json!(vat_code(product.vat_rate)));
    }

    fn decode_line(&self, line: &Record<'_>, item: &mut OrderItem) {
        item.vat_rate = decode_vat(line.raw(VAT_CODE));
        item.vat_amount = line.f64(VAT_AMOUNT);
    }

    fn encode_line(&self, item: &OrderItem, line: &mut Map<String, Value>) {
        let rate = effective_rate(item.vat_rate);
        line.insert(VAT_CODE.into(), json!(vat_code(rate)));
        line.insert(VAT_AMOUNT.into(), json!(vat_included(item.total, rate)));
    }

    fn encode_order(&self, order: &Order, payload: &mut Map<String, Value>) {
        payload.insert(CURRENCY.into(), json!(currency_or_default(&order.currency)));
    }

    fn decode_customer(&self, record: &Record<'_>, customer: &mut Customer) {
        customer.edrpou = record.string(EDRPOU);
        customer.ipn = record.string(IPN);
        customer.is_vat_payer = record.flag(VAT_PAYER);

        let counterparty_type = record.string(COUNTERPARTY_TYPE);
        let is_company = counterparty_type == LEGAL_ENTITY
            || (counterparty_type.is_empty() && !customer.edrpou.is_empty());

        if is_company {
            customer.customer_type = CustomerType::Company;
            customer.company_name = customer.name.clone();
        } else {
            customer.customer_type = CustomerType::Individual;
        }
    }

    fn encode_customer(&self, customer: &Customer, payload: &mut Map<String, Value>) {
        if customer.is_company() {
            payload.insert(COUNTERPARTY_TYPE.into(), json!(LEGAL_ENTITY));
            payload.insert(EDRPOU.into(), json!(customer.edrpou));
            payload.insert(VAT_PAYER.into(), json!(customer.is_vat_payer));
            if !customer.company_name.is_empty() {
                payload.insert(BAS_SCHEMA.description.into(), json!(customer.company_name));
            }
        } else {
            payload.insert(COUNTERPARTY_TYPE.into(), json!(NATURAL_PERSON));
            if !customer.ipn.is_empty() {
                payload.insert(IPN.into(), json!(customer.ipn));
            }
        }
    }

    fn encode_customer_update(&self, customer: &Customer, payload: &mut Map<String, Value>) {
        if !customer.edrpou.is_empty() {
            payload.insert(EDRPOU.into(), json!(customer.edrpou));
        }
        if !customer.ipn.is_empty() {
            payload.insert(IPN.into(), json!(customer.ipn));
        }
    }
}

fn currency_or_default(currency: &str) -> &str {
    if currency.is_empty() {
        DEFAULT_CURRENCY
    } else {
        currency
    }
}

// ============================================================================
// BAS Client
// ============================================================================

impl ODataProvider<Bas> {
    pub fn new(config: BasConfig) -> Result<Self> {
        let dialect = Bas {
            cash_account_ref: config.cash_account_ref,
            bank_account_ref: config.bank_account_ref,
            contract_template: config.contract_template,
        };
        Self::with_dialect(dialect, config.odata)
    }

    /// Post a sales invoice (видаткова накладна), linked to its order when
    /// `order_id` is set.
    pub async fn create_invoice(&self, mut invoice: Invoice) -> Result<Invoice> {
        let s = &BAS_SCHEMA;

        let lines: Vec<Value> = invoice
            .items
            .iter()
            .map(|item| {
                let rate = effective_rate(item.vat_rate);
                let vat_amount = if item.vat_amount > 0.0 {
                    item.vat_amount
                } else {
                    vat_included(item.total, rate)
                };

                let mut line = Map::new();
                line.insert("Номенклатура_Key".into(), json!(item.external_id));
                line.insert(s.line_quantity.into(), json!(item.quantity));
                line.insert(s.line_price.into(), json!(item.price));
                line.insert(s.line_total.into(), json!(item.total));
                line.insert(VAT_CODE.into(), json!(vat_code(rate)));
                line.insert(VAT_AMOUNT.into(), json!(vat_amount));
                Value::Object(line)
            })
            .collect();

        let mut payload = Map::new();
        payload.insert(
            s.date.into(),
            json!(format_datetime(invoice.date.unwrap_or_else(Utc::now))),
        );
        payload.insert(s.number.into(), json!(invoice.number));
        payload.insert(s.organization.into(), json!(self.config.organization_ref));
        payload.insert("Контрагент_Key".into(), json!(invoice.customer_id));
        payload.insert("Склад_Key".into(), json!(self.config.warehouse_ref));
        payload.insert(s.document_total.into(), json!(invoice.total));
        payload.insert(VAT_AMOUNT.into(), json!(invoice.vat_amount));
        payload.insert(s.lines.into(), Value::Array(lines));
        payload.insert(CURRENCY.into(), json!(currency_or_default(&invoice.currency)));
        if !invoice.order_id.is_empty() {
            payload.insert("ЗамовленняКлієнта_Key".into(), json!(invoice.order_id));
        }

        let created = self
            .odata
            .create(SALES_INVOICE, &Value::Object(payload))
            .await?;
        let id = created
            .as_ref()
            .map(|e| Record::new(e).string("Ref_Key"))
            .unwrap_or_default();

        invoice.external_id = require_id(Bas::LABEL, "invoice", id)?;
        Ok(invoice)
    }

    /// Register a payment: a cash receipt, or a payment order for `card`/`bank`.
    pub async fn create_payment(&self, order_id: &str, amount: f64, payment_method: &str) -> Result<()> {
        let s = &BAS_SCHEMA;

        let (document, account_field, account_ref) = match payment_method {
            "card" | "bank" => (
                PAYMENT_ORDER,
                "БанківськийРахунок_Key",
                &self.dialect.bank_account_ref,
            ),
            _ => (CASH_RECEIPT, "Каса_Key", &self.dialect.cash_account_ref),
        };

        let mut payload = Map::new();
        payload.insert(s.date.into(), json!(format_datetime(Utc::now())));
        payload.insert(s.organization.into(), json!(self.config.organization_ref));
        payload.insert(s.document_total.into(), json!(amount));
        payload.insert(CURRENCY.into(), json!(DEFAULT_CURRENCY));
        if !account_ref.is_empty() {
            payload.insert(account_field.into(), json!(account_ref));
        }
        if !order_id.is_empty() {
            payload.insert("ЗамовленняКлієнта_Key".into(), json!(order_id));
        }

        tracing::debug!(document, payment_method, amount, "Posting BAS payment document");

        self.odata.create(document, &Value::Object(payload)).await?;
        Ok(())
    }

    pub fn contract_template(&self) -> &str {
        &self.dialect.contract_template
    }
}
