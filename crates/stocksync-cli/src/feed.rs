//! Feed inspection commands.

use std::fmt::Write as _;
use std::path::Path;

use stocksync_feed::{parse_feed, DataLossReport, FeedCache, ParseStats, QuantitySummary};

/// Download the feed and print its entries sorted by SKU.
pub(crate) async fn run_feed_show(cache: &FeedCache, limit: Option<usize>) {
    let snapshot = cache.get_feed(false).await;
    if snapshot.is_empty() {
        println!("supplier feed is empty or could not be downloaded");
        return;
    }

    let mut entries: Vec<(&String, &i64)> = snapshot.entries().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    println!("{:<32}QTY", "SKU");
    for (sku, qty) in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{sku:<32}{qty}");
    }
    println!();
    println!(
        "{} entries, fetched {}",
        snapshot.len(),
        snapshot.fetched_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
}

/// Download the feed and print parse counters and data loss.
///
/// # Errors
///
/// Returns an error if the download failed and no stats exist.
pub(crate) async fn run_feed_stats(cache: &FeedCache) -> anyhow::Result<()> {
    let snapshot = cache.get_feed(false).await;
    let Some(stats) = cache.get_stats().await else {
        anyhow::bail!("supplier feed could not be downloaded; no stats available");
    };

    let report = render_report(
        &stats,
        &snapshot.data_loss(),
        &snapshot.quantity_summary(),
    );
    print!("{report}");
    Ok(())
}

/// Parse a local CSV export and print the same diagnosis as `feed stats`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub(crate) fn run_feed_inspect(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let parsed = parse_feed(&bytes);

    let loss = parsed.stats.data_loss(parsed.entries.len());
    let quantities = QuantitySummary::from_quantities(parsed.entries.values().copied());

    println!("File: {}", path.display());
    print!("{}", render_report(&parsed.stats, &loss, &quantities));
    Ok(())
}

pub(crate) fn render_report(
    stats: &ParseStats,
    loss: &DataLossReport,
    quantities: &QuantitySummary,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Lines:");
    let _ = writeln!(out, "  total           {}", stats.total_lines);
    let _ = writeln!(out, "  processed       {}", stats.processed_lines);
    let _ = writeln!(out, "  empty skipped   {}", stats.skipped_empty);
    let _ = writeln!(out, "  no SKU skipped  {}", stats.skipped_no_sku);
    let _ = writeln!(out, "  duplicate SKUs  {}", stats.duplicate_skus);
    let _ = writeln!(out, "  valid entries   {}", stats.valid_entries);

    let _ = writeln!(out, "Data loss:");
    let _ = writeln!(
        out,
        "  {} of {} rows did not become a unique entry ({:.2}%)",
        loss.lost_rows, loss.expected_rows, loss.loss_percent
    );
    for (cause, count) in loss.causes() {
        let _ = writeln!(out, "  - {cause}: {count}");
    }

    let _ = writeln!(out, "Quantities:");
    match (quantities.min, quantities.max, quantities.average) {
        (Some(min), Some(max), Some(average)) => {
            let _ = writeln!(out, "  min {min}, max {max}, average {average:.2}");
        }
        _ => {
            let _ = writeln!(out, "  no entries");
        }
    }
    let _ = writeln!(
        out,
        "  zero stock {}, positive stock {}",
        quantities.zero_stock, quantities.positive_stock
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_for(csv: &str) -> String {
        let parsed = parse_feed(csv.as_bytes());
        let loss = parsed.stats.data_loss(parsed.entries.len());
        let quantities = QuantitySummary::from_quantities(parsed.entries.values().copied());
        render_report(&parsed.stats, &loss, &quantities)
    }

    #[test]
    fn report_lists_loss_causes() {
        let report = report_for("Variant SKU,Variant Inventory Qty\nABC,5\n,3\nABC,7\nDEF,0\n");

        assert!(report.contains("total           5"));
        assert!(report.contains("2 of 4 rows did not become a unique entry (50.00%)"));
        assert!(report.contains("rows skipped for a missing or empty SKU: 1"));
        assert!(report.contains("duplicate SKUs overwritten by a later row: 1"));
        assert!(!report.contains("completely empty rows skipped"));
        assert!(report.contains("min 0, max 7, average 3.50"));
        assert!(report.contains("zero stock 1, positive stock 1"));
    }

    #[test]
    fn report_for_header_only_feed_has_no_quantities() {
        let report = report_for("Variant SKU,Variant Inventory Qty\n");

        assert!(report.contains("0 of 0 rows"));
        assert!(report.contains("no entries"));
    }

    #[test]
    fn inspect_reports_unreadable_file() {
        let err = run_feed_inspect(Path::new("/nonexistent/stocksync/feed.csv")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
