//! Parse counters and the data-loss report derived from them.

use serde::{Deserialize, Serialize};

/// Counters collected while parsing one feed.
///
/// Invariants: `valid_entries == processed_lines - skipped_no_sku`, and
/// `valid_entries <= total_lines - 1` whenever a header row was read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Every record read, including the header and empty rows.
    pub total_lines: u64,
    /// Data rows after the header that were not empty.
    pub processed_lines: u64,
    pub skipped_empty: u64,
    pub skipped_no_sku: u64,
    /// Rows whose SKU was already present; the later row overwrote it.
    pub duplicate_skus: u64,
    pub valid_entries: u64,
}

impl ParseStats {
    /// Compares the rows the feed should have produced against the number of
    /// unique entries that survived parsing.
    #[must_use]
    pub fn data_loss(&self, unique_entries: usize) -> DataLossReport {
        let expected_rows = self.total_lines.saturating_sub(1);
        let actual_entries = u64::try_from(unique_entries).unwrap_or(u64::MAX);
        let lost_rows = expected_rows.saturating_sub(actual_entries);

        #[allow(clippy::cast_precision_loss)]
        let loss_percent = if expected_rows == 0 {
            0.0
        } else {
            let raw = lost_rows as f64 / expected_rows as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };

        DataLossReport {
            expected_rows,
            actual_entries,
            lost_rows,
            loss_percent,
            skipped_no_sku: self.skipped_no_sku,
            duplicates_overwritten: self.duplicate_skus,
            skipped_empty: self.skipped_empty,
        }
    }
}

/// How many data rows did not become a unique feed entry, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataLossReport {
    /// `total_lines - 1`: every record except the header.
    pub expected_rows: u64,
    pub actual_entries: u64,
    pub lost_rows: u64,
    /// Rounded to two decimals.
    pub loss_percent: f64,
    pub skipped_no_sku: u64,
    pub duplicates_overwritten: u64,
    pub skipped_empty: u64,
}

impl DataLossReport {
    #[must_use]
    pub fn has_loss(&self) -> bool {
        self.lost_rows > 0
    }

    /// Non-zero loss causes with a human-readable label, largest first.
    #[must_use]
    pub fn causes(&self) -> Vec<(&'static str, u64)> {
        let mut causes: Vec<(&'static str, u64)> = [
            ("rows skipped for a missing or empty SKU", self.skipped_no_sku),
            (
                "duplicate SKUs overwritten by a later row",
                self.duplicates_overwritten,
            ),
            ("completely empty rows skipped", self.skipped_empty),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();
        causes.sort_by(|a, b| b.1.cmp(&a.1));
        causes
    }
}
