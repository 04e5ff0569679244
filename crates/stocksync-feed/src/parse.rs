//! CSV feed parser.
//!
//! Turns the raw supplier export into a SKU to quantity map and the
//! [`ParseStats`] that explain how many rows were dropped and why. Parsing
//! never fails: malformed rows are counted and skipped.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::stats::ParseStats;

const SKU_COLUMN: &str = "variant sku";
const QUANTITY_COLUMN: &str = "variant inventory qty";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static NON_QUANTITY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-]").expect("valid quantity regex"));

/// Result of parsing one feed body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Trimmed, case-preserving SKU to quantity. Later rows win.
    pub entries: HashMap<String, i64>,
    pub stats: ParseStats,
    /// Lower-cased SKU to quantity, filled in row order.
    pub(crate) folded: HashMap<String, i64>,
}

/// Parses a raw CSV feed body.
///
/// The first record is the header. Its cells are matched against the
/// `Variant SKU` and `Variant Inventory Qty` columns case- and
/// whitespace-insensitively; rows may be shorter or longer than the header.
#[must_use]
pub fn parse_feed(raw: &[u8]) -> ParsedFeed {
    let data = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut feed = ParsedFeed::default();
    let mut stats = ParseStats::default();
    let mut columns: Option<Columns> = None;
    let mut record_lines: u64 = 0;
    let mut record = csv::ByteRecord::new();

    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                tracing::warn!(line, error = %e, "unreadable feed record, counting it as empty");
                stats.total_lines += 1;
                stats.skipped_empty += 1;
                record_lines += 1;
                continue;
            }
        }

        stats.total_lines += 1;
        record_lines += 1 + embedded_newlines(&record);

        let Some(cols) = &columns else {
            if is_blank(&record) {
                stats.skipped_empty += 1;
            }
            columns = Some(Columns::from_header(&record));
            continue;
        };

        if is_blank(&record) {
            stats.skipped_empty += 1;
            continue;
        }
        stats.processed_lines += 1;

        let Some(sku) = cols
            .sku
            .and_then(|i| cell(&record, i))
            .filter(|s| !s.is_empty())
        else {
            stats.skipped_no_sku += 1;
            continue;
        };

        let quantity = cols
            .quantity
            .and_then(|i| cell(&record, i))
            .map_or(0, |raw| parse_quantity(&raw));

        if feed.entries.contains_key(&sku) {
            stats.duplicate_skus += 1;
            tracing::debug!(
                sku = %sku,
                line = record.position().map_or(0, csv::Position::line),
                "duplicate SKU in feed, later row wins"
            );
        }

        feed.folded.insert(sku.to_lowercase(), quantity);
        feed.entries.insert(sku, quantity);
        stats.valid_entries += 1;
    }

    // The CSV reader silently skips lines with no content at all. Count them
    // the way a line-by-line reader would have seen them.
    let blank_lines = physical_lines(data).saturating_sub(record_lines);
    stats.total_lines += blank_lines;
    stats.skipped_empty += blank_lines;

    tracing::debug!(
        total_lines = stats.total_lines,
        processed_lines = stats.processed_lines,
        skipped_empty = stats.skipped_empty,
        skipped_no_sku = stats.skipped_no_sku,
        duplicate_skus = stats.duplicate_skus,
        valid_entries = stats.valid_entries,
        "parsed supplier feed"
    );

    feed.stats = stats;
    feed
}

/// Header positions of the two columns the feed is read for.
struct Columns {
    sku: Option<usize>,
    quantity: Option<usize>,
}

impl Columns {
    fn from_header(record: &csv::ByteRecord) -> Self {
        let names: Vec<String> = record
            .iter()
            .map(|c| normalize_header(&String::from_utf8_lossy(c)))
            .collect();
        // A repeated column name maps to its last occurrence.
        Self {
            sku: names.iter().rposition(|n| n == SKU_COLUMN),
            quantity: names.iter().rposition(|n| n == QUANTITY_COLUMN),
        }
    }
}

/// Lower-cases, trims and collapses internal whitespace runs to one space.
fn normalize_header(name: &str) -> String {
    WHITESPACE_RUN
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// Trimmed cell text, `None` when the row is too short.
fn cell(record: &csv::ByteRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
}

fn is_blank(record: &csv::ByteRecord) -> bool {
    record
        .iter()
        .all(|c| String::from_utf8_lossy(c).trim().is_empty())
}

fn embedded_newlines(record: &csv::ByteRecord) -> u64 {
    let count: usize = record
        .iter()
        .map(|c| c.iter().filter(|&&b| b == b'\n').count())
        .sum();
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Number of `\n`-terminated lines, plus one for an unterminated tail.
fn physical_lines(data: &[u8]) -> u64 {
    let newlines = data.iter().filter(|&&b| b == b'\n').count();
    let tail = usize::from(!data.is_empty() && data.last() != Some(&b'\n'));
    u64::try_from(newlines + tail).unwrap_or(u64::MAX)
}

/// Keeps digits and `-`, then reads the leading signed integer.
///
/// `"1,234 units"` is 1234, `"N/A"` is 0, `"5-3"` is 5. Values beyond the
/// `i64` range saturate.
fn parse_quantity(raw: &str) -> i64 {
    let sanitized = NON_QUANTITY_CHARS.replace_all(raw, "");
    leading_integer(&sanitized)
}

fn leading_integer(s: &str) -> i64 {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
    let digits = &rest[..len];
    if digits.is_empty() {
        return 0;
    }

    match digits.parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
