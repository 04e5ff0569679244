//! Postgres-backed [`CatalogStore`].

use async_trait::async_trait;
use sqlx::PgPool;
use stocksync_core::{
    BackorderSetting, CatalogError, CatalogStore, ProductId, StockStateUpdate, StockStatus,
    TrackedProduct,
};

use crate::product_meta::{META_SUPPLIER_SKU, META_SUPPLIER_STOCKED, META_SUPPLIER_THRESHOLD};

/// Product stock columns joined with its supplier metadata.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductStockRow {
    pub id: i64,
    pub sku: Option<String>,
    pub manage_stock: bool,
    pub stock_quantity: i64,
    pub stock_status: String,
    pub backorders: String,
    pub supplier_stocked: Option<String>,
    pub supplier_sku: Option<String>,
    pub supplier_threshold: Option<String>,
}

impl ProductStockRow {
    /// Converts the raw row, rejecting unknown status values and malformed
    /// thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidData`] naming the offending field.
    pub fn into_tracked(self) -> Result<TrackedProduct, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidData {
            id: self.id,
            reason,
        };

        let stock_status = self
            .stock_status
            .parse::<StockStatus>()
            .map_err(|e| invalid(e.to_string()))?;
        let backorders = self
            .backorders
            .parse::<BackorderSetting>()
            .map_err(|e| invalid(e.to_string()))?;

        let threshold = match self.supplier_threshold.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(t) if t >= 0 => Some(t),
                _ => return Err(invalid(format!("invalid supplier threshold \"{raw}\""))),
            },
        };

        Ok(TrackedProduct {
            id: self.id,
            supplier_stocked: self.supplier_stocked.as_deref() == Some("yes"),
            sku: self.sku,
            supplier_sku: self.supplier_sku,
            threshold,
            manage_stock: self.manage_stock,
            stock_quantity: self.stock_quantity,
            stock_status,
            backorders,
        })
    }
}

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(e: sqlx::Error) -> CatalogError {
    CatalogError::Backend(Box::new(e))
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn list_tracked_ids(&self) -> Result<Vec<ProductId>, CatalogError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT product_id FROM product_meta \
             WHERE meta_key = $1 AND meta_value = 'yes' \
             ORDER BY product_id",
        )
        .bind(META_SUPPLIER_STOCKED)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)
    }

    async fn load_product(&self, id: ProductId) -> Result<Option<TrackedProduct>, CatalogError> {
        let row = sqlx::query_as::<_, ProductStockRow>(
            "SELECT p.id, p.sku, p.manage_stock, p.stock_quantity, p.stock_status, p.backorders, \
                    stocked.meta_value AS supplier_stocked, \
                    sku_meta.meta_value AS supplier_sku, \
                    threshold.meta_value AS supplier_threshold \
             FROM products p \
             LEFT JOIN product_meta stocked \
                    ON stocked.product_id = p.id AND stocked.meta_key = $2 \
             LEFT JOIN product_meta sku_meta \
                    ON sku_meta.product_id = p.id AND sku_meta.meta_key = $3 \
             LEFT JOIN product_meta threshold \
                    ON threshold.product_id = p.id AND threshold.meta_key = $4 \
             WHERE p.id = $1",
        )
        .bind(id)
        .bind(META_SUPPLIER_STOCKED)
        .bind(META_SUPPLIER_SKU)
        .bind(META_SUPPLIER_THRESHOLD)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(ProductStockRow::into_tracked).transpose()
    }

    async fn write_stock_state(
        &self,
        id: ProductId,
        update: &StockStateUpdate,
    ) -> Result<(), CatalogError> {
        let result = sqlx::query(
            "UPDATE products \
             SET stock_status = $1, backorders = $2, manage_stock = $3, updated_at = NOW() \
             WHERE id = $4",
        )
        .bind(update.stock_status.as_str())
        .bind(update.backorders.as_str())
        .bind(update.manage_stock)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ProductStockRow {
        ProductStockRow {
            id: 11,
            sku: Some("MTB-100".to_string()),
            manage_stock: true,
            stock_quantity: 2,
            stock_status: "on_backorder".to_string(),
            backorders: "notify".to_string(),
            supplier_stocked: Some("yes".to_string()),
            supplier_sku: None,
            supplier_threshold: Some(" 4 ".to_string()),
        }
    }

    #[test]
    fn row_converts_to_tracked_product() {
        let product = row().into_tracked().unwrap();
        assert_eq!(product.id, 11);
        assert!(product.supplier_stocked);
        assert_eq!(product.threshold, Some(4));
        assert_eq!(product.stock_status, StockStatus::OnBackorder);
        assert_eq!(product.backorders, BackorderSetting::Notify);
    }

    #[test]
    fn stocked_flag_requires_yes() {
        for value in [None, Some("no"), Some("YES "), Some("")] {
            let mut r = row();
            r.supplier_stocked = value.map(str::to_string);
            assert!(!r.into_tracked().unwrap().supplier_stocked, "{value:?}");
        }
    }

    #[test]
    fn blank_threshold_is_no_override() {
        let mut r = row();
        r.supplier_threshold = Some("  ".to_string());
        assert_eq!(r.into_tracked().unwrap().threshold, None);
    }

    #[test]
    fn malformed_threshold_is_invalid_data() {
        for raw in ["abc", "-1", "2.5"] {
            let mut r = row();
            r.supplier_threshold = Some(raw.to_string());
            assert!(matches!(
                r.into_tracked(),
                Err(CatalogError::InvalidData { id: 11, .. })
            ));
        }
    }

    #[test]
    fn unknown_stock_status_is_invalid_data() {
        let mut r = row();
        r.stock_status = "discontinued".to_string();
        assert!(matches!(
            r.into_tracked(),
            Err(CatalogError::InvalidData { .. })
        ));
    }
}
