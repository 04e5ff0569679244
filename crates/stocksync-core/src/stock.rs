use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Catalog identifier of a product or variation.
pub type ProductId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OnBackorder,
    OutOfStock,
}

impl StockStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OnBackorder => "on_backorder",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "on_backorder" => Ok(StockStatus::OnBackorder),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(CoreError::InvalidStockStatus(other.to_string())),
        }
    }
}

/// Whether customers may order a product that is not held locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackorderSetting {
    No,
    /// Allowed, and the customer is told about the delay.
    Notify,
    Yes,
}

impl BackorderSetting {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackorderSetting::No => "no",
            BackorderSetting::Notify => "notify",
            BackorderSetting::Yes => "yes",
        }
    }
}

impl std::fmt::Display for BackorderSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackorderSetting {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(BackorderSetting::No),
            "notify" => Ok(BackorderSetting::Notify),
            "yes" => Ok(BackorderSetting::Yes),
            other => Err(CoreError::InvalidBackorderSetting(other.to_string())),
        }
    }
}

/// A catalog product (or variation) as seen by the sync engine.
///
/// Owned by the catalog store. The engine reads it and may rewrite the
/// stock status, backorder setting and manage-stock flag, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProduct {
    pub id: ProductId,
    /// The product's own SKU.
    pub sku: Option<String>,
    /// Opt-in flag; products without it are never touched.
    pub supplier_stocked: bool,
    /// Overrides `sku` when matching against the supplier feed.
    pub supplier_sku: Option<String>,
    /// Overrides the global default threshold.
    pub threshold: Option<i64>,
    pub manage_stock: bool,
    pub stock_quantity: i64,
    pub stock_status: StockStatus,
    pub backorders: BackorderSetting,
}

impl TrackedProduct {
    /// SKU used to look the product up in the supplier feed: the supplier
    /// override when set, otherwise the product's own SKU.
    ///
    /// Returns `None` when both are missing or blank.
    #[must_use]
    pub fn effective_sku(&self) -> Option<&str> {
        fn non_blank(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
        }
        non_blank(self.supplier_sku.as_deref()).or_else(|| non_blank(self.sku.as_deref()))
    }

    /// Threshold for this product, falling back to `default` when no
    /// product-level override is set.
    #[must_use]
    pub fn effective_threshold(&self, default: i64) -> i64 {
        self.threshold.unwrap_or(default)
    }
}
