//! Output module for reporting crawl results
//!
//! This module handles:
//! - Snapshotting crawl progress into [`CrawlStatistics`]
//! - Formatting and printing the end-of-crawl summary

pub mod stats;

pub use stats::{format_statistics, print_statistics, CrawlStatistics};
