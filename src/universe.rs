//! Symbol universe
//!
//! The ordered list of symbols to scan, each with the sector or thematic
//! tag supplied by the external constituent loader. Supplied once per scan
//! invocation; never mutated during a run.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::types::Symbol;

/// One universe member: ticker plus its externally supplied tag
#[derive(Debug, Clone)]
pub struct UniverseEntry {
    pub symbol: Symbol,
    pub tag: String,
}

/// Ordered, de-duplicated scan universe
#[derive(Debug, Clone, Default)]
pub struct Universe {
    entries: Vec<UniverseEntry>,
}

impl Universe {
    /// Build from (symbol, tag) pairs, keeping the first occurrence of each
    /// symbol and preserving order
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (symbol, tag) in pairs {
            let symbol = Symbol::new(symbol.as_ref().trim());
            if symbol.as_str().is_empty() || !seen.insert(symbol.clone()) {
                continue;
            }
            entries.push(UniverseEntry {
                symbol,
                tag: tag.into(),
            });
        }

        Universe { entries }
    }

    /// Load a universe from a local CSV with `symbol,sector` columns, as
    /// written by the constituent-list loader
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .context(format!("Failed to open universe CSV {}", path.display()))?;

        let headers = reader.headers().context("Failed to read CSV headers")?;
        let symbol_idx = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("symbol"))
            .context("Universe CSV has no SYMBOL column")?;
        let tag_idx = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("sector"));

        let mut pairs = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.context(format!("Failed to read row {}", row_idx + 1))?;
            let symbol = record.get(symbol_idx).unwrap_or("").to_string();
            let tag = tag_idx
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string();
            pairs.push((symbol, tag));
        }

        let universe = Self::from_pairs(pairs);
        info!(
            "Loaded universe of {} symbols from {}",
            universe.len(),
            path.display()
        );
        Ok(universe)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniverseEntry> {
        self.entries.iter()
    }

    /// Fixed-size batches, in universe order
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = &[UniverseEntry]> {
        self.entries.chunks(chunk_size.max(1))
    }
}
