pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use services::erp::{
    BasClient, DilovodClient, ErpError, ErpProvider, ErpService, ODataClient, OneCClient,
    ProviderKind,
};
