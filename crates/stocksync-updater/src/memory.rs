//! In-process [`CatalogStore`] for tests and local experiments.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use stocksync_core::{CatalogError, CatalogStore, ProductId, StockStateUpdate, TrackedProduct};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, TrackedProduct>>,
    failing: RwLock<HashSet<ProductId>>,
    writes: RwLock<Vec<(ProductId, StockStateUpdate)>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = TrackedProduct>) -> Self {
        let map = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: RwLock::new(map),
            ..Self::default()
        }
    }

    pub async fn insert(&self, product: TrackedProduct) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn get(&self, id: ProductId) -> Option<TrackedProduct> {
        self.products.read().await.get(&id).cloned()
    }

    /// Makes every read and write of `id` fail with a backend error.
    pub async fn fail_product(&self, id: ProductId) {
        self.failing.write().await.insert(id);
    }

    /// Every write applied so far, in order.
    pub async fn writes(&self) -> Vec<(ProductId, StockStateUpdate)> {
        self.writes.read().await.clone()
    }

    async fn check_failing(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.failing.read().await.contains(&id) {
            return Err(CatalogError::Backend(
                format!("simulated failure for product {id}").into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn list_tracked_ids(&self) -> Result<Vec<ProductId>, CatalogError> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.supplier_stocked)
            .map(|p| p.id)
            .collect())
    }

    async fn load_product(&self, id: ProductId) -> Result<Option<TrackedProduct>, CatalogError> {
        self.check_failing(id).await?;
        Ok(self.get(id).await)
    }

    async fn write_stock_state(
        &self,
        id: ProductId,
        update: &StockStateUpdate,
    ) -> Result<(), CatalogError> {
        self.check_failing(id).await?;
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(CatalogError::NotFound(id))?;
        product.stock_status = update.stock_status;
        product.backorders = update.backorders;
        product.manage_stock = update.manage_stock;
        drop(products);

        self.writes.write().await.push((id, *update));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocksync_core::{BackorderSetting, StockStatus};

    fn product(id: ProductId, stocked: bool) -> TrackedProduct {
        TrackedProduct {
            id,
            sku: Some(format!("SKU-{id}")),
            supplier_stocked: stocked,
            supplier_sku: None,
            threshold: None,
            manage_stock: false,
            stock_quantity: 0,
            stock_status: StockStatus::OutOfStock,
            backorders: BackorderSetting::No,
        }
    }

    #[tokio::test]
    async fn lists_only_supplier_stocked_ids_in_order() {
        let catalog =
            InMemoryCatalog::with_products([product(3, true), product(1, true), product(2, false)]);
        assert_eq!(catalog.list_tracked_ids().await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn write_updates_stock_fields() {
        let catalog = InMemoryCatalog::with_products([product(1, true)]);
        let update = StockStateUpdate {
            stock_status: StockStatus::OnBackorder,
            backorders: BackorderSetting::Notify,
            manage_stock: true,
        };
        catalog.write_stock_state(1, &update).await.unwrap();

        let stored = catalog.get(1).await.unwrap();
        assert_eq!(stored.stock_status, StockStatus::OnBackorder);
        assert_eq!(stored.backorders, BackorderSetting::Notify);
        assert!(stored.manage_stock);
        assert_eq!(catalog.writes().await, vec![(1, update)]);
    }

    #[tokio::test]
    async fn write_to_missing_product_is_not_found() {
        let catalog = InMemoryCatalog::new();
        let update = StockStateUpdate {
            stock_status: StockStatus::InStock,
            backorders: BackorderSetting::No,
            manage_stock: true,
        };
        let err = catalog.write_stock_state(9, &update).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(9)));
    }

    #[tokio::test]
    async fn failing_product_returns_backend_error() {
        let catalog = InMemoryCatalog::with_products([product(1, true)]);
        catalog.fail_product(1).await;
        let err = catalog.load_product(1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Backend(_)));
    }
}
