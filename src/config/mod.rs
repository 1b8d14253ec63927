use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::services::erp::{
    BasClient, BasConfig, DilovodClient, DilovodConfig, ErpService, ODataConfig, OneCClient,
    OneCConfig, ProviderKind,
};

/// Backend credentials and the default provider, read from the environment.
///
/// A backend is configured only when its mandatory variables are present:
/// `DILOVOD_API_KEY` + `DILOVOD_COMPANY_ID`, `ONEC_BASE_URL` + `ONEC_USERNAME`,
/// `BAS_BASE_URL` + `BAS_USERNAME`.
#[derive(Debug, Clone)]
pub struct ErpSettings {
    pub dilovod: Option<DilovodConfig>,
    pub onec: Option<OneCConfig>,
    pub bas: Option<BasConfig>,
    pub default_provider: String,
}

impl ErpSettings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dilovod = match (var("DILOVOD_API_KEY"), var("DILOVOD_COMPANY_ID")) {
            (Some(api_key), Some(company_id)) => {
                let mut config = DilovodConfig::new(api_key, company_id);
                if let Some(base_url) = var("DILOVOD_BASE_URL") {
                    config.base_url = base_url;
                }
                Some(config)
            }
            _ => None,
        };

        let onec = odata_from(&var, "ONEC");

        let bas = odata_from(&var, "BAS").map(|odata| BasConfig {
            odata,
            cash_account_ref: var("BAS_CASH_ACCOUNT_REF").unwrap_or_default(),
            bank_account_ref: var("BAS_BANK_ACCOUNT_REF").unwrap_or_default(),
            contract_template: var("BAS_CONTRACT_TEMPLATE").unwrap_or_default(),
        });

        let default_provider = match var("ERP_DEFAULT_PROVIDER") {
            Some(name) => ProviderKind::from_str(&name)
                .context("ERP_DEFAULT_PROVIDER must be one of dilovod, 1c, bas")?
                .as_str()
                .to_string(),
            None => {
                let first = if dilovod.is_some() {
                    Some(ProviderKind::Dilovod)
                } else if onec.is_some() {
                    Some(ProviderKind::OneC)
                } else if bas.is_some() {
                    Some(ProviderKind::Bas)
                } else {
                    None
                };
                first.map(|kind| kind.as_str().to_string()).unwrap_or_default()
            }
        };

        Ok(Self {
            dilovod,
            onec,
            bas,
            default_provider,
        })
    }

    pub fn configured(&self) -> Vec<ProviderKind> {
        let mut kinds = Vec::new();
        if self.dilovod.is_some() {
            kinds.push(ProviderKind::Dilovod);
        }
        if self.onec.is_some() {
            kinds.push(ProviderKind::OneC);
        }
        if self.bas.is_some() {
            kinds.push(ProviderKind::Bas);
        }
        kinds
    }

    /// Construct every configured adapter and register it.
    pub fn build_service(&self) -> Result<ErpService> {
        let mut service = ErpService::new(self.default_provider.clone());

        if let Some(config) = &self.dilovod {
            let client = DilovodClient::new(config.clone()).context("invalid Dilovod configuration")?;
            service.register_provider(Arc::new(client));
        }
        if let Some(config) = &self.onec {
            let client = OneCClient::new(config.clone()).context("invalid 1C configuration")?;
            service.register_provider(Arc::new(client));
        }
        if let Some(config) = &self.bas {
            let client = BasClient::new(config.clone()).context("invalid BAS configuration")?;
            service.register_provider(Arc::new(client));
        }

        if !self.default_provider.is_empty() && service.get_provider("").is_err() {
            tracing::warn!(
                default = %self.default_provider,
                "Default ERP provider is not configured"
            );
        }

        Ok(service)
    }
}

fn odata_from<F>(var: &F, prefix: &str) -> Option<ODataConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let key = |name: &str| format!("{}_{}", prefix, name);

    let base_url = var(&key("BASE_URL"))?;
    let username = var(&key("USERNAME"))?;

    let mut config = ODataConfig::new(base_url, username, var(&key("PASSWORD")).unwrap_or_default());
    config.organization_ref = var(&key("ORGANIZATION_REF")).unwrap_or_default();
    config.warehouse_ref = var(&key("WAREHOUSE_REF")).unwrap_or_default();
    config.price_type_ref = var(&key("PRICE_TYPE_REF")).unwrap_or_default();
    Some(config)
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "erp_bridge=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
