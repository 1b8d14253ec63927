// 1C:Enterprise adapter
// Russian-named configuration (Управление торговлей): raw VAT percentages,
// one tax-id field (ИНН) whose meaning depends on ЮрФизЛицо

use serde_json::{json, Map, Value};

use crate::models::erp::{Customer, CustomerType};
use crate::services::erp::lenient::Record;
use crate::services::erp::odata_provider::{Dialect, ODataConfig, ODataProvider, Schema};
use crate::services::erp::provider::Result;

const LEGAL_FORM: &str = "ЮрФизЛицо";
const LEGAL_ENTITY: &str = "ЮридическоеЛицо";
const NATURAL_PERSON: &str = "ФизическоеЛицо";
const TAX_ID: &str = "ИНН";

pub type OneCConfig = ODataConfig;

pub type OneCClient = ODataProvider<OneC>;

static ONEC_SCHEMA: Schema = Schema {
    products: "Catalog_Номенклатура",
    product_select: "Ref_Key,Code,Description,Артикул,ЕдиницаИзмерения_Key,ВидНоменклатуры,НоменклатурнаяГруппа,Производитель,Вес,ПометкаУдаления,ЭтоГруппа",
    code: "Code",
    description: "Description",
    weight: "Вес",
    modified: "ДатаИзменения",
    is_group: "ЭтоГруппа",
    deletion_mark: "ПометкаУдаления",

    orders: "Document_ЗаказКлиента",
    order_select: "Ref_Key,Number,Date,Контрагент_Key,СуммаДокумента,Статус,Склад_Key,Комментарий,ПометкаУдаления",
    number: "Number",
    date: "Date",
    document_total: "СуммаДокумента",
    comment: "Комментарий",
    organization: "Организация",
    lines: "Товары",
    line_quantity: "Количество",
    line_price: "Цена",
    line_total: "Сумма",

    customers: "Catalog_Контрагенты",
    customer_select: "Ref_Key,Code,Description,ИНН,КПП,Телефон,Email,ПометкаУдаления,ЮрФизЛицо,ЭтоГруппа",

    stock_balance: "AccumulationRegister_ТоварыНаСкладах/Balance",
    stock_quantity: "КоличествоBalance",
    stock_correction: "Document_КорректировкаЗапасов",

    warehouses: "Catalog_Склады",
    warehouse_select: "Ref_Key,Code,Description",

    prices: "InformationRegister_ЦеныНоменклатуры/SliceLast",
    price_type: "ТипЦен_Key",
    price: "Цена",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct OneC;

impl Dialect for OneC {
    const NAME: &'static str = "1c";
    const LABEL: &'static str = "1C";

    fn schema(&self) -> &'static Schema {
        &ONEC_SCHEMA
    }

    fn decode_customer(&self, record: &Record<'_>, customer: &mut Customer) {
        let tax_id = record.string(TAX_ID);

        if record.string(LEGAL_FORM) == LEGAL_ENTITY {
            customer.customer_type = CustomerType::Company;
            customer.company_name = customer.name.clone();
            customer.edrpou = tax_id;
        } else {
            customer.customer_type = CustomerType::Individual;
            customer.ipn = tax_id;
        }
    }

    fn encode_customer(&self, customer: &Customer, payload: &mut Map<String, Value>) {
        if customer.is_company() {
            payload.insert(LEGAL_FORM.into(), json!(LEGAL_ENTITY));
            payload.insert(TAX_ID.into(), json!(customer.edrpou));
            if !customer.company_name.is_empty() {
                payload.insert(ONEC_SCHEMA.description.into(), json!(customer.company_name));
            }
        } else {
            payload.insert(LEGAL_FORM.into(), json!(NATURAL_PERSON));
            if !customer.ipn.is_empty() {
                payload.insert(TAX_ID.into(), json!(customer.ipn));
            }
        }
    }
}

impl ODataProvider<OneC> {
    pub fn new(config: OneCConfig) -> Result<Self> {
        Self::with_dialect(OneC, config)
    }
}
