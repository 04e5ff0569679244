pub mod app_config;
pub mod catalog;
pub mod config;
pub mod policy;
pub mod stock;

pub use app_config::{AppConfig, Environment};
pub use catalog::{CatalogError, CatalogStore, StockStateUpdate};
pub use config::{load_app_config, load_app_config_from_env};
pub use policy::{reconcile, PolicyInput, ReconciliationDecision, DEFAULT_THRESHOLD};
pub use stock::{BackorderSetting, ProductId, StockStatus, TrackedProduct};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid stock status: {0}")]
    InvalidStockStatus(String),

    #[error("invalid backorder setting: {0}")]
    InvalidBackorderSetting(String),
}
