//! Per-product supplier settings stored in `product_meta`.

use sqlx::PgPool;
use stocksync_core::ProductId;

use crate::DbError;

pub const META_SUPPLIER_STOCKED: &str = "_supplier_stocked";
pub const META_SUPPLIER_SKU: &str = "_supplier_sku";
pub const META_SUPPLIER_THRESHOLD: &str = "_supplier_threshold";

async fn upsert_meta(
    pool: &PgPool,
    product_id: ProductId,
    key: &str,
    value: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "INSERT INTO product_meta (product_id, meta_key, meta_value) \
         SELECT id, $2, $3 FROM products WHERE id = $1 \
         ON CONFLICT (product_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value",
    )
    .bind(product_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

async fn delete_meta(pool: &PgPool, product_id: ProductId, key: &str) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_meta WHERE product_id = $1 AND meta_key = $2")
        .bind(product_id)
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Opts a product in to (`yes`) or out of (`no`) supplier stock sync.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn set_supplier_stocked(
    pool: &PgPool,
    product_id: ProductId,
    stocked: bool,
) -> Result<(), DbError> {
    let value = if stocked { "yes" } else { "no" };
    upsert_meta(pool, product_id, META_SUPPLIER_STOCKED, value).await
}

/// Sets or removes (`None` or blank) the supplier SKU override.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn set_supplier_sku(
    pool: &PgPool,
    product_id: ProductId,
    sku: Option<&str>,
) -> Result<(), DbError> {
    match sku.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sku) => upsert_meta(pool, product_id, META_SUPPLIER_SKU, sku).await,
        None => delete_meta(pool, product_id, META_SUPPLIER_SKU).await,
    }
}

/// Sets or removes the per-product threshold override.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn set_supplier_threshold(
    pool: &PgPool,
    product_id: ProductId,
    threshold: Option<u32>,
) -> Result<(), DbError> {
    match threshold {
        Some(t) => upsert_meta(pool, product_id, META_SUPPLIER_THRESHOLD, &t.to_string()).await,
        None => delete_meta(pool, product_id, META_SUPPLIER_THRESHOLD).await,
    }
}

/// Removes every supplier setting from a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_supplier_settings(pool: &PgPool, product_id: ProductId) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_meta WHERE product_id = $1 AND meta_key = ANY($2)")
        .bind(product_id)
        .bind(
            [
                META_SUPPLIER_STOCKED,
                META_SUPPLIER_SKU,
                META_SUPPLIER_THRESHOLD,
            ]
            .as_slice(),
        )
        .execute(pool)
        .await?;
    Ok(())
}
