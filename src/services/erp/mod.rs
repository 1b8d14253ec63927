// ERP Integration Module
// Provider contract, generic OData client, Dilovod/1C/BAS adapters, and the sync service

pub mod lenient;
pub mod metrics;
pub mod provider;
pub mod odata_client;
pub mod odata_provider;
pub mod dilovod_client;
pub mod onec;
pub mod bas;
pub mod erp_service;

pub use provider::{ErpError, ErpProvider, ProviderKind, Result};
pub use odata_client::{Entity, ODataClient};
pub use odata_provider::{Dialect, ODataConfig, ODataProvider, Schema};
pub use dilovod_client::{DilovodClient, DilovodConfig, DILOVOD_API_URL};
pub use onec::{OneC, OneCClient, OneCConfig};
pub use bas::{Bas, BasClient, BasConfig};
pub use erp_service::ErpService;
