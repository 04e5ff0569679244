//! The catalog store seam.
//!
//! The sync engine never owns product records. It reads them through
//! [`CatalogStore`] and writes back only the stock state fields.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::stock::{BackorderSetting, ProductId, StockStatus, TrackedProduct};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid catalog data for product {id}: {reason}")]
    InvalidData { id: ProductId, reason: String },

    #[error("product {0} not found")]
    NotFound(ProductId),
}

/// Stock fields the engine is allowed to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockStateUpdate {
    pub stock_status: StockStatus,
    pub backorders: BackorderSetting,
    pub manage_stock: bool,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Ids of every product and variation with the supplier-stocked flag set.
    async fn list_tracked_ids(&self) -> Result<Vec<ProductId>, CatalogError>;

    /// Loads one product with its supplier metadata. `Ok(None)` when the id
    /// does not exist.
    async fn load_product(&self, id: ProductId) -> Result<Option<TrackedProduct>, CatalogError>;

    /// Persists new stock state for one product.
    ///
    /// Returns [`CatalogError::NotFound`] if the product disappeared.
    async fn write_stock_state(
        &self,
        id: ProductId,
        update: &StockStateUpdate,
    ) -> Result<(), CatalogError>;
}
