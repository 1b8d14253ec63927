// Mock ERP Servers for Testing
// Simulates the Dilovod REST API and a 1C/BAS OData publication
// Run with: cargo test --test erp_mock_server

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Mock Data Structures
// ============================================================================

const DILOVOD_KEY: &str = "test-key";
const DILOVOD_COMPANY: &str = "777";

const P1: &str = "11111111-1111-1111-1111-111111111111";
const P2: &str = "22222222-2222-2222-2222-222222222222";
const P3: &str = "33333333-3333-3333-3333-333333333333";
const P4: &str = "44444444-4444-4444-4444-444444444444";
const P5: &str = "55555555-5555-5555-5555-555555555555";
const ORG: &str = "0a0a0a0a-0000-0000-0000-000000000001";
const W1: &str = "0b0b0b0b-0000-0000-0000-000000000001";
const PRICE_TYPE: &str = "0c0c0c0c-0000-0000-0000-000000000001";
const CUSTOMER_REF: &str = "0d0d0d0d-0000-0000-0000-000000000001";
const ORDER_REF: &str = "0e0e0e0e-0000-0000-0000-000000000001";
const INVOICE_REF: &str = "0f0f0f0f-0000-0000-0000-000000000001";
const BANK_ACCOUNT: &str = "0f0f0f0f-0000-0000-0000-0000000000bb";
const CASH_ACCOUNT: &str = "0f0f0f0f-0000-0000-0000-0000000000cc";

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: String,
    pub company: String,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct MockErpState {
    pub odata_base: String,
    pub dilovod_products: Vec<Value>,
    pub dilovod_stock: Vec<Value>,
    pub odata_product_pages: Vec<Vec<Value>>,
    pub requests: Vec<CapturedRequest>,
}

impl MockErpState {
    fn posts(&self) -> Vec<&CapturedRequest> {
        self.requests.iter().filter(|r| r.method == "POST").collect()
    }

    fn requests_to(&self, path: &str) -> Vec<&CapturedRequest> {
        self.requests.iter().filter(|r| r.path == path).collect()
    }
}

type SharedState = Arc<RwLock<MockErpState>>;

fn capture(
    method: &Method,
    path: &str,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Value,
) -> CapturedRequest {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    CapturedRequest {
        method: method.to_string(),
        path: path.to_string(),
        query,
        authorization: header_value(header::AUTHORIZATION.as_str()),
        company: header_value("x-company-id"),
        body,
    }
}

// ============================================================================
// Dilovod Mock Endpoints
// ============================================================================

async fn dilovod_record(
    state: &SharedState,
    request: CapturedRequest,
) -> Result<(), StatusCode> {
    let authorized = request.authorization == format!("Bearer {}", DILOVOD_KEY)
        && request.company == DILOVOD_COMPANY;
    state.write().await.requests.push(request);

    if authorized {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn dilovod_list_products(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::GET, "/products", query, &headers, Value::Null)).await?;

    let state = state.read().await;
    Ok(Json(json!({ "data": state.dilovod_products })))
}

async fn dilovod_get_product(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::GET, "/products/:id", HashMap::new(), &headers, Value::Null)).await?;

    match id.as_str() {
        "42" => Ok(Json(json!({"data": {"id": "42", "sku": "A1", "name": "Widget", "price": "n/a"}}))),
        "empty" => Ok(Json(json!({"data": null}))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn dilovod_create_product(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(status) = dilovod_record(&state, capture(&Method::POST, "/products", HashMap::new(), &headers, body)).await {
        return status.into_response();
    }

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"message":"sku A1 already exists"}"#,
    )
        .into_response()
}

async fn dilovod_create_customer(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::POST, "/customers", HashMap::new(), &headers, body)).await?;
    Ok(Json(json!({"data": {"id": "cust-100"}})))
}

async fn dilovod_create_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::POST, "/orders", HashMap::new(), &headers, body)).await?;
    Ok(Json(json!({"data": {"id": 5001}})))
}

async fn dilovod_stock(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::GET, "/stock", query, &headers, Value::Null)).await?;

    let state = state.read().await;
    Ok(Json(json!({ "data": state.dilovod_stock })))
}

async fn dilovod_stock_movement(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::POST, "/stock/movements", HashMap::new(), &headers, body)).await?;
    Ok(Json(json!({"data": {"id": "mv-1"}})))
}

async fn dilovod_warehouses(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    dilovod_record(&state, capture(&Method::GET, "/warehouses", HashMap::new(), &headers, Value::Null)).await?;
    Ok(Json(json!({"error": "Company is archived"})))
}

fn create_dilovod_mock_server(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/products", get(dilovod_list_products).post(dilovod_create_product))
        .route("/api/v1/products/:id", get(dilovod_get_product))
        .route("/api/v1/customers", post(dilovod_create_customer))
        .route("/api/v1/orders", post(dilovod_create_order))
        .route("/api/v1/stock", get(dilovod_stock))
        .route("/api/v1/stock/movements", post(dilovod_stock_movement))
        .route("/api/v1/warehouses", get(dilovod_warehouses))
        .with_state(state)
}

// ============================================================================
// OData Mock Endpoints
// ============================================================================

/// Entity sets carry Cyrillic names, so routing happens on the decoded path.
async fn odata_handler(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = percent_decode_str(uri.path()).decode_utf8_lossy().into_owned();
    let query: HashMap<String, String> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let request = capture(&method, &path, query.clone(), &headers, payload);
    let mut state = state.write().await;
    let authorized = request.authorization.starts_with("Basic ");
    state.requests.push(request);

    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let Some(resource) = path.strip_prefix("/odata/") else {
        return (StatusCode::NOT_FOUND, "unknown service").into_response();
    };
    let filter = query.get("$filter").cloned().unwrap_or_default();

    match (method.as_str(), resource) {
        // 1C listing: the group filter uses the Russian field name
        ("GET", "Catalog_Номенклатура") if filter.starts_with("ЭтоГруппа") => Json(json!({"value": [
            {"Ref_Key": P1, "Code": "00001", "Description": "Кофе", "Артикул": "", "Вес": 0.5},
            {"Ref_Key": P2, "Code": "00002", "Description": "Списанный кофе", "ПометкаУдаления": true},
            {"Ref_Key": P3, "Description": "Напитки", "ЭтоГруппа": true},
            {"Ref_Key": P4, "Code": "00004", "Description": "Чай", "Артикул": "TEA-4"}
        ]}))
        .into_response(),
        ("GET", "Catalog_Номенклатура") => {
            let page: usize = query
                .get("$skiptoken")
                .and_then(|t| t.parse().ok())
                .unwrap_or(0);
            let items = state.odata_product_pages.get(page).cloned().unwrap_or_default();

            let mut body = json!({ "value": items });
            if page + 1 < state.odata_product_pages.len() {
                // First link relative, later ones absolute
                body["@odata.nextLink"] = if page == 0 {
                    json!(format!("Catalog_Номенклатура?$skiptoken={}", page + 1))
                } else {
                    json!(format!(
                        "{}/odata/Catalog_Номенклатура?$skiptoken={}",
                        state.odata_base,
                        page + 1
                    ))
                };
            }
            Json(body).into_response()
        }
        ("GET", r) if r.starts_with("Catalog_Номенклатура(guid'") => {
            if r.contains(P1) {
                Json(json!({"Ref_Key": P1, "Код": "0001", "Найменування": "Кава", "СтавкаПДВ": "ПДВ20"}))
                    .into_response()
            } else if r.contains(P4) {
                (StatusCode::OK, "").into_response()
            } else {
                (
                    StatusCode::NOT_FOUND,
                    r#"{"odata.error":{"code":"","message":{"value":"Об'єкт не знайдено"}}}"#,
                )
                    .into_response()
            }
        }
        ("GET", "InformationRegister_ЦіниНоменклатури/SliceLast") => {
            Json(json!({"value": [{"Ціна": 99.5}]})).into_response()
        }
        ("GET", "InformationRegister_ЦеныНоменклатуры/SliceLast") => {
            if filter.contains("Номенклатура_Key") {
                Json(json!({"value": [{"Цена": 150.0}]})).into_response()
            } else {
                Json(json!({"value": [
                    {"Номенклатура_Key": P1, "Цена": 10.0},
                    {"Номенклатура_Key": P4, "Цена": 20.5},
                    {"Цена": 1.0}
                ]}))
                .into_response()
            }
        }
        ("GET", "AccumulationRegister_ТоварыНаСкладах/Balance") => {
            Json(json!({"value": [{"КоличествоBalance": 12.0}]})).into_response()
        }
        ("GET", "Catalog_Склады") => Json(json!({"value": [
            {"Ref_Key": W1, "Code": "000000001", "Description": "Основной склад"},
            {"Ref_Key": P2, "Code": "000000002", "Description": "Закрытый склад", "ПометкаУдаления": true}
        ]}))
        .into_response(),
        ("GET", "Catalog_Цикл") => {
            // Broken server: every page points back at itself
            Json(json!({
                "value": [{"Ref_Key": P1}],
                "@odata.nextLink": "Catalog_Цикл?$skiptoken=1"
            }))
            .into_response()
        }
        ("GET", "AccumulationRegister_ЗалишкиТоварів/Balance") => {
            if filter.contains("Номенклатура_Key") {
                Json(json!({"value": [{"КількістьЗалишок": 4.0}, {"КількістьЗалишок": 3.0}]}))
                    .into_response()
            } else {
                Json(json!({"value": [{"Номенклатура_Key": P1, "Склад_Key": W1, "КількістьЗалишок": 5.0}]}))
                    .into_response()
            }
        }
        ("GET", "Catalog_Контрагенти") => Json(json!({"value": [
            {"Ref_Key": CUSTOMER_REF, "Найменування": "ТОВ Ромашка", "ЄДРПОУ": "12345678", "ТипКонтрагента": "ЮридичнаОсоба", "ПлатникПДВ": true},
            {"Ref_Key": P2, "Найменування": "Видалений", "ПозначкаВидалення": true},
            {"Ref_Key": P3, "Найменування": "Оптові клієнти", "ЕтоГрупа": true}
        ]}))
        .into_response(),
        ("GET", "Document_ЗаказКлиента") => Json(json!({"value": [
            {
                "Ref_Key": ORDER_REF,
                "Number": "ЗК-0001",
                "Date": "2024-03-15T10:30:00",
                "СуммаДокумента": 300.0,
                "Статус": "КОтгрузке",
                "Товары": [{"Номенклатура_Key": P1, "Количество": 3, "Цена": 100.0, "Сумма": 300.0}]
            },
            {"Ref_Key": P2, "Number": "ЗК-0002", "ПометкаУдаления": true}
        ]}))
        .into_response(),
        ("GET", "Catalog_Склади") => Json(json!({"value": [
            {"Ref_Key": W1, "Код": "000000001", "Найменування": "Головний склад"},
            {"Ref_Key": P2, "Код": "000000002", "Найменування": "Закритий склад", "ПозначкаВидалення": true}
        ]}))
        .into_response(),
        ("PATCH", r) if r.starts_with("Document_ЗамовленняКлієнта(guid'") => (
            StatusCode::BAD_REQUEST,
            r#"{"odata.error":{"message":{"value":"Невідоме поле Статус"}}}"#,
        )
            .into_response(),
        ("POST", "Catalog_Контрагенти") => {
            (StatusCode::CREATED, Json(json!({"Ref_Key": CUSTOMER_REF}))).into_response()
        }
        ("POST", "Document_ЗамовленняКлієнта") => {
            (StatusCode::CREATED, Json(json!({"Ref_Key": ORDER_REF}))).into_response()
        }
        ("POST", "Document_ВидатковаНакладна") => {
            (StatusCode::CREATED, Json(json!({"Ref_Key": INVOICE_REF}))).into_response()
        }
        ("POST", "Document_ПлатіжнеДоручення")
        | ("POST", "Document_ПрибутковийКасовийОрдер")
        | ("POST", "Document_КоригуванняЗалишків")
        | ("POST", "Document_КорректировкаЗапасов") => StatusCode::NO_CONTENT.into_response(),
        _ => (StatusCode::NOT_FOUND, format!("no entity set {}", resource)).into_response(),
    }
}

fn create_odata_mock_server(state: SharedState) -> Router {
    Router::new().fallback(odata_handler).with_state(state)
}

// ============================================================================
// Test Helper Functions
// ============================================================================

fn product_pages() -> Vec<Vec<Value>> {
    vec![
        vec![
            json!({"Ref_Key": P1, "Код": "0001", "Найменування": "Кава", "Артикул": "COF-1", "СтавкаПДВ": "ПДВ20", "ПозначкаВидалення": false}),
            json!({"Ref_Key": P2, "Код": "0002", "Найменування": "Списана кава", "ПозначкаВидалення": true}),
        ],
        vec![
            json!({"Ref_Key": P3, "Найменування": "Напої", "ЕтоГрупа": true}),
            json!({"Ref_Key": P4, "Код": "0004", "Найменування": "Чай", "СтавкаПДВ": "ПДВ7"}),
        ],
        vec![json!({"Ref_Key": P5, "Код": "0005", "Найменування": "Цукор", "СтавкаПДВ": "БезПДВ", "Вага": "heavy"})],
    ]
}

pub async fn start_mock_servers() -> (String, String, SharedState) {
    let dilovod_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dilovod_addr = dilovod_listener.local_addr().unwrap();
    let odata_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let odata_addr = odata_listener.local_addr().unwrap();

    let dilovod_url = format!("http://{}", dilovod_addr);
    let odata_url = format!("http://{}", odata_addr);

    let state = Arc::new(RwLock::new(MockErpState {
        odata_base: odata_url.clone(),
        dilovod_products: vec![
            json!({"id": "42", "sku": "A1", "name": "Widget", "is_active": false, "price": 9.99}),
        ],
        dilovod_stock: vec![
            json!({"product_id": "42", "sku": "A1", "warehouse_id": "main", "quantity": 2, "reserved": 5}),
            json!({"product_id": 43, "sku": "B2", "warehouse_id": "main", "quantity": 10, "reserved": 3, "available": 99}),
        ],
        odata_product_pages: product_pages(),
        requests: Vec::new(),
    }));

    let dilovod_app = create_dilovod_mock_server(state.clone());
    let odata_app = create_odata_mock_server(state.clone());

    tokio::spawn(async move {
        axum::serve(dilovod_listener, dilovod_app).await.unwrap();
    });
    tokio::spawn(async move {
        axum::serve(odata_listener, odata_app).await.unwrap();
    });

    (dilovod_url, odata_url, state)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use erp_bridge::models::erp::{Customer, CustomerType, Invoice, Order, OrderItem};
    use erp_bridge::services::erp::{
        BasClient, BasConfig, DilovodClient, DilovodConfig, ErpError, ErpProvider, ErpService,
        ODataClient, ODataConfig, OneCClient,
    };

    fn dilovod(url: &str) -> DilovodClient {
        DilovodClient::new(
            DilovodConfig::new(DILOVOD_KEY, DILOVOD_COMPANY).with_base_url(format!("{}/api/v1", url)),
        )
        .unwrap()
    }

    fn odata_config(url: &str) -> ODataConfig {
        let mut config = ODataConfig::new(format!("{}/odata", url), "admin", "secret");
        config.organization_ref = ORG.to_string();
        config.warehouse_ref = W1.to_string();
        config.price_type_ref = PRICE_TYPE.to_string();
        config
    }

    fn bas(url: &str) -> BasClient {
        let mut config = BasConfig::new(odata_config(url));
        config.bank_account_ref = BANK_ACCOUNT.to_string();
        config.cash_account_ref = CASH_ACCOUNT.to_string();
        BasClient::new(config).unwrap()
    }

    fn service_with(provider: Arc<dyn ErpProvider>) -> ErpService {
        let mut service = ErpService::new(provider.name().to_string());
        service.register_provider(provider);
        service
    }

    // ------------------------------------------------------------------------
    // Dilovod
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dilovod_products_scenario() {
        let (dilovod_url, _, state) = start_mock_servers().await;

        let products = dilovod(&dilovod_url).get_products(None).await.unwrap();

        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert_eq!(product.external_id, "42");
        assert_eq!(product.sku, "A1");
        assert_eq!(product.name, "Widget");
        assert!(!product.is_active);
        assert_eq!(product.price, 9.99);
        assert_eq!(product.stock, 0);

        let state = state.read().await;
        let request = state.requests_to("/products")[0];
        assert_eq!(request.authorization, "Bearer test-key");
        assert_eq!(request.company, "777");
        assert_eq!(request.query.get("limit").map(String::as_str), Some("1000"));
        assert!(!request.query.contains_key("modified_after"));
    }

    #[tokio::test]
    async fn test_dilovod_modified_after_filter() {
        let (dilovod_url, _, state) = start_mock_servers().await;

        let since = chrono::DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        dilovod(&dilovod_url).get_products(Some(since)).await.unwrap();

        let state = state.read().await;
        let request = state.requests_to("/products")[0];
        assert_eq!(
            request.query.get("modified_after").map(String::as_str),
            Some("2024-05-01T08:00:00")
        );
    }

    #[tokio::test]
    async fn test_dilovod_mistyped_field_is_zero() {
        let (dilovod_url, _, _state) = start_mock_servers().await;

        let product = dilovod(&dilovod_url).get_product("42").await.unwrap();
        assert_eq!(product.price, 0.0);
        assert!(product.is_active);
    }

    #[tokio::test]
    async fn test_dilovod_not_found() {
        let (dilovod_url, _, _state) = start_mock_servers().await;
        let client = dilovod(&dilovod_url);

        assert!(client.get_product("missing").await.unwrap_err().is_not_found());
        assert!(client.get_product("empty").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_dilovod_error_body_surfaced() {
        let (dilovod_url, _, _state) = start_mock_servers().await;
        let client = dilovod(&dilovod_url);

        let product = erp_bridge::models::erp::Product {
            sku: "A1".into(),
            name: "Widget".into(),
            ..Default::default()
        };
        let err = client.create_product(product).await.unwrap_err();
        match &err {
            ErpError::Api { status, body, .. } => {
                assert_eq!(status.as_u16(), 422);
                assert!(body.contains("sku A1 already exists"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("sku A1 already exists"));

        let err = client.get_warehouses().await.unwrap_err();
        assert!(matches!(err, ErpError::Vendor { .. }));
        assert!(err.to_string().contains("Company is archived"));
    }

    #[tokio::test]
    async fn test_dilovod_wrong_credentials() {
        let (dilovod_url, _, _state) = start_mock_servers().await;

        let client = DilovodClient::new(
            DilovodConfig::new("wrong", DILOVOD_COMPANY).with_base_url(format!("{}/api/v1", dilovod_url)),
        )
        .unwrap();

        match client.get_products(None).await.unwrap_err() {
            ErpError::Api { status, .. } => assert_eq!(status.as_u16(), 401),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dilovod_export_order_creates_customer_first() {
        let (dilovod_url, _, state) = start_mock_servers().await;
        let service = service_with(Arc::new(dilovod(&dilovod_url)));

        let mut order = Order::new("SO-1");
        order.customer = Some(Customer {
            name: "Олена Коваль".into(),
            phone: "+380501234567".into(),
            ipn: "1234567890".into(),
            ..Default::default()
        });
        order.items.push(OrderItem {
            external_id: "42".into(),
            quantity: 2,
            price: 9.99,
            total: 19.98,
            ..Default::default()
        });

        let exported = service.export_order("", order).await.unwrap();
        assert_eq!(exported.external_id, "5001");
        assert_eq!(exported.customer.unwrap().external_id, "cust-100");

        let state = state.read().await;
        let posts = state.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].path, "/customers");
        assert_eq!(posts[0].body["ipn"], "1234567890");
        assert_eq!(posts[1].path, "/orders");
        assert_eq!(posts[1].body["customer_id"], "cust-100");
        assert_eq!(posts[1].body["items"][0]["product_id"], "42");
        assert!(posts[1].body.get("discount").is_none());
    }

    #[tokio::test]
    async fn test_dilovod_stock_available_not_clamped() {
        let (dilovod_url, _, state) = start_mock_servers().await;
        let service = service_with(Arc::new(dilovod(&dilovod_url)));

        let stock = service.sync_stock("dilovod", "main").await.unwrap();
        assert_eq!(stock.len(), 2);
        for record in &stock {
            assert_eq!(record.available, record.quantity - record.reserved);
        }
        assert_eq!(stock[0].available, -3);
        assert_eq!(stock[1].product_id, "43");
        assert_eq!(stock[1].available, 7);

        let state = state.read().await;
        let request = state.requests_to("/stock")[0];
        assert_eq!(request.query.get("limit").map(String::as_str), Some("10000"));
        assert_eq!(request.query.get("warehouse_id").map(String::as_str), Some("main"));
    }

    #[tokio::test]
    async fn test_dilovod_update_stock_posts_adjustment() {
        let (dilovod_url, _, state) = start_mock_servers().await;

        dilovod(&dilovod_url).update_stock("42", "main", 15).await.unwrap();

        let state = state.read().await;
        let request = state.requests_to("/stock/movements")[0];
        assert_eq!(request.body["type"], "adjustment");
        assert_eq!(request.body["quantity"], 15);
        assert_eq!(request.body["warehouse_id"], "main");
    }

    #[tokio::test]
    async fn test_sync_products_reports_fetched_count() {
        let (dilovod_url, _, _state) = start_mock_servers().await;
        let service = service_with(Arc::new(dilovod(&dilovod_url)));

        let result = service.sync_products("", None).await.unwrap();
        assert_eq!(result.entity_type, "products");
        assert_eq!(result.updated, 1);
        assert_eq!(result.created, 0);
        assert!(result.completed_at.is_some());

        let err = service.sync_products("unknown", None).await.unwrap_err();
        assert!(err.to_string().contains("unknown"));
    }

    // ------------------------------------------------------------------------
    // Generic OData client
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_odata_pagination_concatenates_pages() {
        let (_, odata_url, state) = start_mock_servers().await;

        let client = ODataClient::new(&format!("{}/odata", odata_url), "admin", "secret").unwrap();
        let entities = client.get("Catalog_Номенклатура", "", "", "").await.unwrap();

        let keys: Vec<&str> = entities
            .iter()
            .filter_map(|e| e.get("Ref_Key").and_then(Value::as_str))
            .collect();
        assert_eq!(keys, vec![P1, P2, P3, P4, P5]);

        let state = state.read().await;
        let pages = state.requests_to("/odata/Catalog_Номенклатура");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].query.get("$format").map(String::as_str), Some("json"));
        assert!(!pages[0].query.contains_key("$filter"));
        assert_eq!(pages[1].query.get("$skiptoken").map(String::as_str), Some("1"));
        assert_eq!(pages[2].query.get("$skiptoken").map(String::as_str), Some("2"));
        assert!(pages[0].authorization.starts_with("Basic "));
    }

    #[tokio::test]
    async fn test_odata_invalid_guid_is_not_found_without_request() {
        let (_, odata_url, state) = start_mock_servers().await;

        let client = ODataClient::new(&format!("{}/odata", odata_url), "admin", "secret").unwrap();
        let err = client.get_by_id("Catalog_Номенклатура", "not-a-guid").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(state.read().await.requests.is_empty());
    }

    #[tokio::test]
    async fn test_odata_empty_entity_body_is_not_found() {
        let (_, odata_url, state) = start_mock_servers().await;

        let client = ODataClient::new(&format!("{}/odata", odata_url), "admin", "secret").unwrap();
        let err = client.get_by_id("Catalog_Номенклатура", P4).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(state.read().await.requests.len(), 1);
    }

    #[tokio::test]
    async fn test_odata_repeated_next_link_stops() {
        let (_, odata_url, state) = start_mock_servers().await;

        let client = ODataClient::new(&format!("{}/odata", odata_url), "admin", "secret").unwrap();
        let entities = client.get("Catalog_Цикл", "", "", "").await.unwrap();
        assert_eq!(entities.len(), 2);

        let state = state.read().await;
        let pages = state.requests_to("/odata/Catalog_Цикл");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].query.get("$skiptoken").map(String::as_str), Some("1"));
    }

    // ------------------------------------------------------------------------
    // BAS
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_bas_products_skip_tombstones_and_enrich() {
        let (_, odata_url, state) = start_mock_servers().await;

        let products = bas(&odata_url).get_products(None).await.unwrap();

        let keys: Vec<&str> = products.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(keys, vec![P1, P4, P5]);

        assert_eq!(products[0].sku, "COF-1");
        assert_eq!(products[0].vat_rate, 20.0);
        assert_eq!(products[1].sku, "0004");
        assert_eq!(products[1].vat_rate, 7.0);
        assert_eq!(products[2].vat_rate, 0.0);
        assert_eq!(products[2].weight, 0.0);

        for product in &products {
            assert_eq!(product.price, 99.5);
            assert_eq!(product.stock, 7);
            assert!(product.is_active);
        }

        let state = state.read().await;
        let first = state.requests_to("/odata/Catalog_Номенклатура")[0];
        assert_eq!(first.query.get("$filter").map(String::as_str), Some("ЕтоГрупа eq false"));

        let price_lookups = state.requests_to("/odata/InformationRegister_ЦіниНоменклатури/SliceLast");
        assert_eq!(price_lookups.len(), 3);
        assert_eq!(
            price_lookups[0].query.get("$filter").map(String::as_str),
            Some(format!("Номенклатура_Key eq guid'{}' and ТипЦін_Key eq guid'{}'", P1, PRICE_TYPE).as_str())
        );
    }

    #[tokio::test]
    async fn test_bas_customers_skip_tombstones() {
        let (_, odata_url, _state) = start_mock_servers().await;

        let customers = bas(&odata_url).get_customers(None).await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].customer_type, CustomerType::Company);
        assert_eq!(customers[0].edrpou, "12345678");
        assert!(customers[0].is_vat_payer);
    }

    #[tokio::test]
    async fn test_bas_export_order_vat_and_customer_first() {
        let (_, odata_url, state) = start_mock_servers().await;
        let service = service_with(Arc::new(bas(&odata_url)));

        let mut order = Order::new("ЗМ-100");
        order.total = 120.0;
        order.customer = Some(Customer {
            name: "Олена Коваль".into(),
            ipn: "1234567890".into(),
            ..Default::default()
        });
        order.items.push(OrderItem {
            external_id: P1.into(),
            quantity: 1,
            price: 120.0,
            total: 120.0,
            ..Default::default()
        });

        let exported = service.export_order("bas", order).await.unwrap();
        assert_eq!(exported.external_id, ORDER_REF);
        assert_eq!(exported.customer.unwrap().external_id, CUSTOMER_REF);

        let state = state.read().await;
        let posts = state.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].path, "/odata/Catalog_Контрагенти");
        assert_eq!(posts[0].body["ТипКонтрагента"], "ФізичнаОсоба");
        assert_eq!(posts[0].body["ІПН"], "1234567890");

        let body = &posts[1].body;
        assert_eq!(posts[1].path, "/odata/Document_ЗамовленняКлієнта");
        assert_eq!(body["Контрагент_Key"], CUSTOMER_REF);
        assert_eq!(body["Організація"], ORG);
        assert_eq!(body["Склад_Key"], W1);
        assert_eq!(body["Валюта"], "UAH");
        assert_eq!(body["Товари"][0]["СтавкаПДВ"], "ПДВ20");
        let vat = body["Товари"][0]["СумаПДВ"].as_f64().unwrap();
        assert!((vat - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_bas_get_product_by_guid() {
        let (_, odata_url, _state) = start_mock_servers().await;
        let client = bas(&odata_url);

        let product = client.get_product(P1).await.unwrap();
        assert_eq!(product.name, "Кава");
        assert_eq!(product.price, 99.5);

        let err = client.get_product(P5).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_bas_error_body_surfaced() {
        let (_, odata_url, _state) = start_mock_servers().await;

        let err = bas(&odata_url)
            .update_order_status(ORDER_REF, "Виконано")
            .await
            .unwrap_err();
        match &err {
            ErpError::Api { status, body, .. } => {
                assert_eq!(status.as_u16(), 400);
                assert!(body.contains("Невідоме поле Статус"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bas_warehouses_skip_deleted() {
        let (_, odata_url, state) = start_mock_servers().await;

        let warehouses = bas(&odata_url).get_warehouses().await.unwrap();
        assert_eq!(warehouses.len(), 1);
        assert_eq!(warehouses[0].external_id, W1);
        assert_eq!(warehouses[0].name, "Головний склад");
        assert!(warehouses[0].is_active);

        let state = state.read().await;
        let request = state.requests_to("/odata/Catalog_Склади")[0];
        assert_eq!(
            request.query.get("$filter").map(String::as_str),
            Some("ПозначкаВидалення eq false")
        );
    }

    #[tokio::test]
    async fn test_bas_stock_and_correction() {
        let (_, odata_url, state) = start_mock_servers().await;
        let client = bas(&odata_url);

        let stock = client.get_stock("").await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].warehouse_id, W1);
        assert_eq!(stock[0].available, stock[0].quantity - stock[0].reserved);
        assert_eq!(stock[0].available, 5);

        client.update_stock(P1, "", 12).await.unwrap();

        let state = state.read().await;
        let listing = state.requests_to("/odata/AccumulationRegister_ЗалишкиТоварів/Balance")[0];
        assert_eq!(
            listing.query.get("$filter").map(String::as_str),
            Some(format!("Склад_Key eq guid'{}'", W1).as_str())
        );

        let correction = state.requests_to("/odata/Document_КоригуванняЗалишків")[0];
        assert_eq!(correction.body["Склад"], W1);
        assert_eq!(correction.body["Організація"], ORG);
        assert_eq!(correction.body["Товари"][0]["Номенклатура"], P1);
        assert_eq!(correction.body["Товари"][0]["Кількість"], 12);
    }

    #[tokio::test]
    async fn test_bas_invoice_and_payments() {
        let (_, odata_url, state) = start_mock_servers().await;
        let client = bas(&odata_url);

        let invoice = Invoice {
            number: "ВН-1".into(),
            order_id: ORDER_REF.into(),
            customer_id: CUSTOMER_REF.into(),
            items: vec![OrderItem {
                external_id: P1.into(),
                quantity: 1,
                price: 107.0,
                total: 107.0,
                vat_rate: 7.0,
                ..Default::default()
            }],
            total: 107.0,
            vat_amount: 7.0,
            ..Default::default()
        };
        let created = client.create_invoice(invoice).await.unwrap();
        assert_eq!(created.external_id, INVOICE_REF);

        client.create_payment(ORDER_REF, 107.0, "card").await.unwrap();
        client.create_payment(ORDER_REF, 50.0, "cash").await.unwrap();

        let state = state.read().await;
        let invoice = state.requests_to("/odata/Document_ВидатковаНакладна")[0].body.clone();
        assert_eq!(invoice["ЗамовленняКлієнта_Key"], ORDER_REF);
        assert_eq!(invoice["Валюта"], "UAH");
        assert_eq!(invoice["Товари"][0]["СтавкаПДВ"], "ПДВ7");

        let bank = state.requests_to("/odata/Document_ПлатіжнеДоручення")[0].body.clone();
        assert_eq!(bank["БанківськийРахунок_Key"], BANK_ACCOUNT);
        assert_eq!(bank["СумаДокумента"], 107.0);

        let cash = state.requests_to("/odata/Document_ПрибутковийКасовийОрдер")[0].body.clone();
        assert_eq!(cash["Каса_Key"], CASH_ACCOUNT);
        assert!(cash.get("БанківськийРахунок_Key").is_none());
    }

    // ------------------------------------------------------------------------
    // 1C
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_onec_orders_skip_deleted() {
        let (_, odata_url, state) = start_mock_servers().await;
        let client = OneCClient::new(odata_config(&odata_url)).unwrap();

        let orders = client.get_orders(None).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].number, "ЗК-0001");
        assert_eq!(orders[0].status, "КОтгрузке");
        assert_eq!(orders[0].items.len(), 1);
        assert_eq!(orders[0].items[0].quantity, 3);

        let state = state.read().await;
        let request = state.requests_to("/odata/Document_ЗаказКлиента")[0];
        assert_eq!(request.query.get("$expand").map(String::as_str), Some("Товары"));
    }

    #[tokio::test]
    async fn test_onec_products_skip_tombstones_and_enrich() {
        let (_, odata_url, state) = start_mock_servers().await;
        let client = OneCClient::new(odata_config(&odata_url)).unwrap();

        let products = client.get_products(None).await.unwrap();

        let keys: Vec<&str> = products.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(keys, vec![P1, P4]);
        assert_eq!(products[0].sku, "00001");
        assert_eq!(products[0].name, "Кофе");
        assert_eq!(products[0].weight, 0.5);
        assert_eq!(products[1].sku, "TEA-4");
        for product in &products {
            assert_eq!(product.price, 150.0);
            assert_eq!(product.stock, 12);
        }

        let state = state.read().await;
        let listing = state.requests_to("/odata/Catalog_Номенклатура")[0];
        assert_eq!(listing.query.get("$filter").map(String::as_str), Some("ЭтоГруппа eq false"));

        let prices = state.requests_to("/odata/InformationRegister_ЦеныНоменклатуры/SliceLast");
        assert_eq!(prices.len(), 2);
        assert_eq!(
            prices[1].query.get("$filter").map(String::as_str),
            Some(format!("Номенклатура_Key eq guid'{}' and ТипЦен_Key eq guid'{}'", P4, PRICE_TYPE).as_str())
        );

        let stock = state.requests_to("/odata/AccumulationRegister_ТоварыНаСкладах/Balance");
        assert_eq!(stock.len(), 2);
        assert_eq!(
            stock[0].query.get("$filter").map(String::as_str),
            Some(format!("Номенклатура_Key eq guid'{}' and Склад_Key eq guid'{}'", P1, W1).as_str())
        );
    }

    #[tokio::test]
    async fn test_onec_update_stock_posts_correction() {
        let (_, odata_url, state) = start_mock_servers().await;
        let client = OneCClient::new(odata_config(&odata_url)).unwrap();

        client.update_stock(P1, "", 5).await.unwrap();

        let state = state.read().await;
        let correction = state.requests_to("/odata/Document_КорректировкаЗапасов")[0].body.clone();
        assert_eq!(correction["Склад"], W1);
        assert_eq!(correction["Организация"], ORG);
        assert_eq!(correction["Товары"][0]["Номенклатура"], P1);
        assert_eq!(correction["Товары"][0]["Количество"], 5);
    }

    #[tokio::test]
    async fn test_onec_warehouses_skip_deleted() {
        let (_, odata_url, state) = start_mock_servers().await;
        let client = OneCClient::new(odata_config(&odata_url)).unwrap();

        let warehouses = client.get_warehouses().await.unwrap();
        assert_eq!(warehouses.len(), 1);
        assert_eq!(warehouses[0].external_id, W1);
        assert_eq!(warehouses[0].code, "000000001");

        let state = state.read().await;
        let request = state.requests_to("/odata/Catalog_Склады")[0];
        assert_eq!(
            request.query.get("$filter").map(String::as_str),
            Some("ПометкаУдаления eq false")
        );
    }

    #[tokio::test]
    async fn test_onec_price_slice() {
        let (_, odata_url, _state) = start_mock_servers().await;
        let client = OneCClient::new(odata_config(&odata_url)).unwrap();

        let prices = client.get_prices().await.unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices.get(P1), Some(&10.0));
        assert_eq!(prices.get(P4), Some(&20.5));
    }
}
