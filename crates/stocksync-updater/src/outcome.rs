use chrono::{DateTime, Utc};
use serde::Serialize;
use stocksync_core::StockStatus;

/// Why a product was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ProductNotFound,
    NotSupplierStocked,
    NoSku,
    EmptyFeed,
    SkuNotInFeed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::ProductNotFound => "product not found",
            Self::NotSupplierStocked => "product is not supplier-stocked",
            Self::NoSku => "product has no SKU",
            Self::EmptyFeed => "supplier feed is empty",
            Self::SkuNotInFeed => "SKU not present in supplier feed",
        };
        f.write_str(text)
    }
}

/// Result of reconciling one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Stock state was written. `from` and `to` are equal when only the
    /// manage-stock flag had to be switched on.
    Updated { from: StockStatus, to: StockStatus },
    Unchanged,
    Skipped(SkipReason),
    /// The catalog failed to read or write this product.
    Failed(String),
}

/// Per-outcome tally for a batch of products.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl UpdateSummary {
    pub fn record(&mut self, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Updated { .. } => self.updated += 1,
            UpdateOutcome::Unchanged => self.unchanged += 1,
            UpdateOutcome::Skipped(_) => self.skipped += 1,
            UpdateOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &UpdateSummary) {
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.skipped + self.failed
    }
}

impl<'a> FromIterator<&'a UpdateOutcome> for UpdateSummary {
    fn from_iter<I: IntoIterator<Item = &'a UpdateOutcome>>(iter: I) -> Self {
        let mut summary = Self::default();
        for outcome in iter {
            summary.record(outcome);
        }
        summary
    }
}

/// What one sync cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Supplier-stocked products found in the catalog.
    pub tracked: usize,
    /// Entries in the feed snapshot the cycle used.
    pub feed_entries: usize,
    pub summary: UpdateSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when the cycle could not list tracked products.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    pub(crate) fn empty(started_at: DateTime<Utc>, error: Option<String>) -> Self {
        Self {
            tracked: 0,
            feed_entries: 0,
            summary: UpdateSummary::default(),
            started_at,
            finished_at: Utc::now(),
            error,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tallies_each_outcome_kind() {
        let outcomes = [
            UpdateOutcome::Updated {
                from: StockStatus::OutOfStock,
                to: StockStatus::OnBackorder,
            },
            UpdateOutcome::Unchanged,
            UpdateOutcome::Unchanged,
            UpdateOutcome::Skipped(SkipReason::NoSku),
            UpdateOutcome::Failed("boom".to_string()),
        ];
        let summary: UpdateSummary = outcomes.iter().collect();
        assert_eq!(
            summary,
            UpdateSummary {
                updated: 1,
                unchanged: 2,
                skipped: 1,
                failed: 1,
            }
        );
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = UpdateSummary {
            updated: 1,
            ..UpdateSummary::default()
        };
        a.merge(&UpdateSummary {
            updated: 2,
            failed: 1,
            ..UpdateSummary::default()
        });
        assert_eq!(a.updated, 3);
        assert_eq!(a.failed, 1);
    }

    #[test]
    fn outcome_serializes_with_tag_and_detail() {
        let json = serde_json::to_value(UpdateOutcome::Updated {
            from: StockStatus::OutOfStock,
            to: StockStatus::OnBackorder,
        })
        .unwrap();
        assert_eq!(json["outcome"], "updated");
        assert_eq!(json["detail"]["to"], "on_backorder");

        let json = serde_json::to_value(UpdateOutcome::Skipped(SkipReason::SkuNotInFeed)).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["detail"], "sku_not_in_feed");
    }

    #[test]
    fn empty_report_omits_error_when_none() {
        let report = SyncReport::empty(Utc::now(), None);
        assert!(report.succeeded());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["tracked"], 0);
    }
}
