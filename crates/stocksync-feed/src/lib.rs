pub mod cache;
pub mod client;
pub mod error;
pub mod parse;
mod retry;
pub mod snapshot;
pub mod stats;

pub use cache::FeedCache;
pub use client::{FeedClient, FeedSource};
pub use error::FeedError;
pub use parse::{parse_feed, ParsedFeed};
pub use snapshot::{FeedSnapshot, QuantitySummary};
pub use stats::{DataLossReport, ParseStats};
