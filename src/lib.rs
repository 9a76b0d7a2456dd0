//! Breakout Screener
//!
//! Scans a universe of NSE symbols for closes printing at or above their
//! trailing N-session highs across multiple lookback windows, with bounded
//! retry around the price feed and per-run signal de-duplication.

pub mod analyzer;
pub mod config;
pub mod dedup;
pub mod feed;
pub mod retry;
pub mod scanner;
pub mod sink;
pub mod types;
pub mod universe;

pub use config::Config;
pub use dedup::Deduplicator;
pub use scanner::{CycleSummary, Scanner};
pub use types::*;
pub use universe::Universe;
