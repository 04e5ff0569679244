use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::parse::ParsedFeed;
use crate::stats::{DataLossReport, ParseStats};

/// One parsed feed, immutable once built.
///
/// The cache swaps whole snapshots; nothing mutates one in place.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    entries: HashMap<String, i64>,
    folded: HashMap<String, i64>,
    stats: ParseStats,
    fetched_at: DateTime<Utc>,
    built: Instant,
    ttl: Duration,
}

impl FeedSnapshot {
    #[must_use]
    pub fn new(parsed: ParsedFeed, ttl: Duration) -> Self {
        Self {
            entries: parsed.entries,
            folded: parsed.folded,
            stats: parsed.stats,
            fetched_at: Utc::now(),
            built: Instant::now(),
            ttl,
        }
    }

    /// The "no data" snapshot handed out when nothing usable is cached.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(ParsedFeed::default(), Duration::ZERO)
    }

    /// Quantity for `sku`: exact match first, then case-insensitive.
    #[must_use]
    pub fn quantity_for(&self, sku: &str) -> Option<i64> {
        self.entries
            .get(sku)
            .or_else(|| self.folded.get(&sku.to_lowercase()))
            .copied()
    }

    #[must_use]
    pub fn entries(&self) -> &HashMap<String, i64> {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.built.elapsed() >= self.ttl
    }

    pub(crate) fn built_at(&self) -> Instant {
        self.built
    }

    #[must_use]
    pub fn data_loss(&self) -> DataLossReport {
        self.stats.data_loss(self.entries.len())
    }

    #[must_use]
    pub fn quantity_summary(&self) -> QuantitySummary {
        QuantitySummary::from_quantities(self.entries.values().copied())
    }
}

/// Distribution of supplier quantities across a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantitySummary {
    pub count: usize,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub average: Option<f64>,
    /// Entries with exactly zero supplier stock.
    pub zero_stock: usize,
    pub positive_stock: usize,
}

impl QuantitySummary {
    #[must_use]
    pub fn from_quantities(quantities: impl IntoIterator<Item = i64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0i128;
        let mut min = None;
        let mut max = None;
        let mut zero_stock = 0;
        let mut positive_stock = 0;

        for qty in quantities {
            count += 1;
            sum += i128::from(qty);
            min = Some(min.map_or(qty, |m: i64| m.min(qty)));
            max = Some(max.map_or(qty, |m: i64| m.max(qty)));
            match qty.signum() {
                0 => zero_stock += 1,
                1 => positive_stock += 1,
                _ => {}
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let average = (count > 0).then(|| sum as f64 / count as f64);

        Self {
            count,
            min,
            max,
            average,
            zero_stock,
            positive_stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_feed;

    fn snapshot(raw: &str) -> FeedSnapshot {
        FeedSnapshot::new(parse_feed(raw.as_bytes()), Duration::from_secs(900))
    }

    #[test]
    fn quantity_for_prefers_exact_match() {
        let snap = snapshot("Variant SKU,Variant Inventory Qty\nabc,1\nABC,2\n");
        assert_eq!(snap.quantity_for("abc"), Some(1));
        assert_eq!(snap.quantity_for("ABC"), Some(2));
    }

    #[test]
    fn quantity_for_falls_back_to_case_insensitive() {
        let snap = snapshot("Variant SKU,Variant Inventory Qty\nSku-9,4\n");
        assert_eq!(snap.quantity_for("SKU-9"), Some(4));
        assert_eq!(snap.quantity_for("sku-9"), Some(4));
        assert_eq!(snap.quantity_for("sku-10"), None);
    }

    #[test]
    fn case_insensitive_collision_uses_last_row() {
        let snap = snapshot("Variant SKU,Variant Inventory Qty\nab,1\nAB,2\n");
        assert_eq!(snap.quantity_for("aB"), Some(2));
    }

    #[test]
    fn empty_snapshot_is_expired_and_has_no_entries() {
        let snap = FeedSnapshot::empty();
        assert!(snap.is_empty());
        assert!(snap.is_expired());
        assert_eq!(snap.stats(), &ParseStats::default());
        assert_eq!(snap.quantity_for("anything"), None);
    }

    #[test]
    fn fresh_snapshot_is_not_expired() {
        let snap = snapshot("Variant SKU,Variant Inventory Qty\nA,1\n");
        assert!(!snap.is_expired());
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn quantity_summary_distribution() {
        let summary = QuantitySummary::from_quantities([0, 4, -2, 10, 0]);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.min, Some(-2));
        assert_eq!(summary.max, Some(10));
        assert!((summary.average.unwrap() - 2.4).abs() < 1e-9);
        assert_eq!(summary.zero_stock, 2);
        assert_eq!(summary.positive_stock, 2);
    }

    #[test]
    fn quantity_summary_of_nothing() {
        let summary = QuantitySummary::from_quantities(std::iter::empty());
        assert_eq!(summary.count, 0);
        assert_eq!(summary.min, None);
        assert_eq!(summary.average, None);
    }

    #[test]
    fn snapshot_data_loss_uses_unique_entries() {
        let snap = snapshot("Variant SKU,Variant Inventory Qty\nA,1\nA,2\n,3\n");
        let report = snap.data_loss();
        assert_eq!(report.expected_rows, 3);
        assert_eq!(report.actual_entries, 1);
        assert_eq!(report.lost_rows, 2);
    }
}
