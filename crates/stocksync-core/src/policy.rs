//! Stock-status reconciliation against supplier availability.
//!
//! [`reconcile`] is a pure function: it decides what a product's stock status
//! and backorder setting should be, and the caller decides whether to write.

use serde::Serialize;

use crate::stock::{BackorderSetting, StockStatus, TrackedProduct};

/// Global threshold used when neither configuration nor the product sets one.
pub const DEFAULT_THRESHOLD: i64 = 1;

/// Everything the policy looks at for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput {
    pub supplier_qty: i64,
    pub threshold: i64,
    pub current_stock_qty: i64,
    pub current_status: StockStatus,
    pub current_backorders: BackorderSetting,
}

impl PolicyInput {
    #[must_use]
    pub fn for_product(product: &TrackedProduct, supplier_qty: i64, threshold: i64) -> Self {
        Self {
            supplier_qty,
            threshold,
            current_stock_qty: product.stock_quantity,
            current_status: product.stock_status,
            current_backorders: product.backorders,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationDecision {
    pub new_status: StockStatus,
    pub new_backorders: BackorderSetting,
    /// `true` when either field differs from the current value.
    pub changed: bool,
}

/// Decides the stock status and backorder setting for one product.
///
/// Rules, first match wins:
/// 1. Local stock on hand while on backorder: `in_stock`, backorders `no`.
///    An `in_stock` product with local stock stays there while the supplier
///    is at or above `threshold`.
/// 2. Supplier quantity at or above `threshold`: `on_backorder`, backorders `notify`.
/// 3. Otherwise: `out_of_stock`, backorders `no`.
#[must_use]
pub fn reconcile(input: &PolicyInput) -> ReconciliationDecision {
    let supplier_available = input.supplier_qty >= input.threshold;
    let local_stock_recovered = input.current_stock_qty > 0
        && match input.current_status {
            StockStatus::OnBackorder => true,
            StockStatus::InStock => supplier_available,
            StockStatus::OutOfStock => false,
        };

    let (new_status, new_backorders) = if local_stock_recovered {
        (StockStatus::InStock, BackorderSetting::No)
    } else if supplier_available {
        (StockStatus::OnBackorder, BackorderSetting::Notify)
    } else {
        (StockStatus::OutOfStock, BackorderSetting::No)
    };

    ReconciliationDecision {
        new_status,
        new_backorders,
        changed: new_status != input.current_status
            || new_backorders != input.current_backorders,
    }
}
