//! Per-product supplier settings.

use stocksync_db::DbError;

fn not_found(id: i64, e: DbError) -> anyhow::Error {
    match e {
        DbError::NotFound => anyhow::anyhow!("product {id} not found"),
        other => other.into(),
    }
}

/// Opt a product in to supplier sync, optionally setting its overrides.
///
/// # Errors
///
/// Returns an error if the product does not exist or a write fails.
pub(crate) async fn run_track(
    pool: &sqlx::PgPool,
    id: i64,
    supplier_sku: Option<&str>,
    threshold: Option<u32>,
) -> anyhow::Result<()> {
    stocksync_db::set_supplier_stocked(pool, id, true)
        .await
        .map_err(|e| not_found(id, e))?;
    if let Some(sku) = supplier_sku {
        stocksync_db::set_supplier_sku(pool, id, Some(sku)).await?;
    }
    if let Some(threshold) = threshold {
        stocksync_db::set_supplier_threshold(pool, id, Some(threshold)).await?;
    }

    println!("product {id}: supplier stock sync enabled");
    Ok(())
}

/// Opt a product out of supplier sync. With `clear`, every supplier setting
/// is removed instead.
///
/// # Errors
///
/// Returns an error if the product does not exist or a write fails.
pub(crate) async fn run_untrack(pool: &sqlx::PgPool, id: i64, clear: bool) -> anyhow::Result<()> {
    if clear {
        stocksync_db::clear_supplier_settings(pool, id).await?;
        println!("product {id}: supplier settings removed");
    } else {
        stocksync_db::set_supplier_stocked(pool, id, false)
            .await
            .map_err(|e| not_found(id, e))?;
        println!("product {id}: supplier stock sync disabled");
    }
    Ok(())
}
