// ERP Service
// Named provider registry with an injected default, plus one-pass sync calls
// that fetch from a backend and report counts as SyncResult bookkeeping

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::erp::{Order, ProductStock, SyncResult};
use crate::services::erp::metrics;
use crate::services::erp::provider::{ErpError, ErpProvider, Result};

pub struct ErpService {
    providers: HashMap<String, Arc<dyn ErpProvider>>,
    default_provider: String,
}

impl ErpService {
    /// `default_provider` is what an empty provider name resolves to.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register under `provider.name()`, replacing any provider of that name.
    pub fn register_provider(&mut self, provider: Arc<dyn ErpProvider>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::info!(provider = %name, "Replaced ERP provider");
        } else {
            tracing::info!(provider = %name, "Registered ERP provider");
        }
    }

    pub fn get_provider(&self, name: &str) -> Result<Arc<dyn ErpProvider>> {
        let name = if name.is_empty() {
            self.default_provider.as_str()
        } else {
            name
        };

        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ErpError::ProviderNotFound(name.to_string()))
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    // ========================================================================
    // Sync Operations
    // ========================================================================

    pub async fn sync_products(
        &self,
        provider_name: &str,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<SyncResult> {
        let provider = self.get_provider(provider_name)?;
        let result = SyncResult::start("products");

        let fetched = provider.get_products(updated_since).await.map(|p| p.len());
        finish_sync(provider.name(), result, fetched)
    }

    pub async fn sync_orders(
        &self,
        provider_name: &str,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<SyncResult> {
        let provider = self.get_provider(provider_name)?;
        let result = SyncResult::start("orders");

        let fetched = provider.get_orders(updated_since).await.map(|o| o.len());
        finish_sync(provider.name(), result, fetched)
    }

    pub async fn sync_customers(
        &self,
        provider_name: &str,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<SyncResult> {
        let provider = self.get_provider(provider_name)?;
        let result = SyncResult::start("customers");

        let fetched = provider.get_customers(updated_since).await.map(|c| c.len());
        finish_sync(provider.name(), result, fetched)
    }

    /// Create the order in the backend, creating its customer first if needed.
    pub async fn export_order(&self, provider_name: &str, order: Order) -> Result<Order> {
        let provider = self.get_provider(provider_name)?;

        let exported = provider.create_order(order).await?;
        tracing::info!(
            provider = provider.name(),
            order = %exported.number,
            external_id = %exported.external_id,
            "Exported order"
        );

        Ok(exported)
    }

    pub async fn sync_stock(&self, provider_name: &str, warehouse_id: &str) -> Result<Vec<ProductStock>> {
        let provider = self.get_provider(provider_name)?;

        match provider.get_stock(warehouse_id).await {
            Ok(stock) => {
                metrics::record_sync(provider.name(), "stock", stock.len());
                tracing::info!(
                    provider = provider.name(),
                    warehouse = warehouse_id,
                    records = stock.len(),
                    "Stock sync completed"
                );
                Ok(stock)
            }
            Err(e) => {
                metrics::record_sync_failure(provider.name(), "stock");
                tracing::error!(provider = provider.name(), "Stock sync failed: {}", e);
                Err(e)
            }
        }
    }
}

/// A pass reports everything it fetched as updated; there is no diff.
fn finish_sync(provider: &str, mut result: SyncResult, fetched: Result<usize>) -> Result<SyncResult> {
    match fetched {
        Ok(count) => {
            result.updated = count;
            metrics::record_sync(provider, &result.entity_type, count);

            let result = result.complete();
            tracing::info!(
                provider,
                entity = %result.entity_type,
                updated = result.updated,
                "Sync completed"
            );
            Ok(result)
        }
        Err(e) => {
            metrics::record_sync_failure(provider, &result.entity_type);
            tracing::error!(provider, entity = %result.entity_type, "Sync failed: {}", e);
            Err(e)
        }
    }
}
