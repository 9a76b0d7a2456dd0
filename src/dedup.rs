//! Signal de-duplication
//!
//! Tracks which (symbol, lookback, session-date) triples have already been
//! emitted so repeated scans within one process never repeat an alert.
//! A restarted process starts empty and will re-emit the day's signals
//! once; that is documented behavior, not a defect.

use std::collections::HashSet;

use crate::types::{SeenKey, Signal};

/// Set-backed deduplicator with O(1) admit
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<SeenKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the signal's key on first sight and return true; return false
    /// for any later signal with an equal key
    pub fn admit(&mut self, signal: &Signal) -> bool {
        self.seen.insert(signal.seen_key())
    }

    /// Number of distinct keys admitted so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Explicit reset; equivalent to starting a new run
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
