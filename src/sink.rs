//! Signal sinks
//!
//! Append-only destinations for emitted signals: one row per signal, the
//! minimal schema from the signal itself. The orchestrator additionally
//! logs every admitted signal, so a sink only has to persist.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;

use crate::types::Signal;

/// Append-only record stream for emitted signals
pub trait SignalSink {
    fn emit(&mut self, signal: &Signal) -> Result<()>;
}

/// CSV sink: appends rows to a file, writing the header only when the file
/// is created
pub struct CsvSink {
    writer: csv::Writer<std::fs::File>,
}

impl CsvSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_new = !path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(format!("Failed to open signal CSV {}", path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer
                .write_record([
                    "symbol",
                    "lookback",
                    "as_of",
                    "close",
                    "window_high",
                    "window_high_date",
                    "kind",
                ])
                .context("Failed to write CSV header")?;
        }

        Ok(CsvSink { writer })
    }
}

impl SignalSink for CsvSink {
    fn emit(&mut self, signal: &Signal) -> Result<()> {
        self.writer
            .write_record([
                signal.symbol.as_str().to_string(),
                signal.lookback.to_string(),
                signal.as_of.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("{:.2}", signal.close),
                format!("{:.2}", signal.window_high),
                signal.window_high_date.format("%Y-%m-%d").to_string(),
                signal.kind.to_string(),
            ])
            .context("Failed to write signal row")?;
        self.writer.flush().context("Failed to flush signal CSV")?;
        Ok(())
    }
}

/// In-memory sink for tests and library callers
#[derive(Debug, Default)]
pub struct MemorySink {
    pub signals: Vec<Signal>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSink for MemorySink {
    fn emit(&mut self, signal: &Signal) -> Result<()> {
        self.signals.push(signal.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalKind, Symbol};
    use chrono::{TimeZone, Utc};

    fn sample_signal() -> Signal {
        Signal {
            symbol: Symbol::new("TCS.NS"),
            lookback: 50,
            as_of: Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap(),
            close: 3912.5,
            window_high: 3900.0,
            window_high_date: Utc.with_ymd_and_hms(2023, 12, 18, 0, 0, 0).unwrap(),
            kind: SignalKind::FreshHigh,
        }
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::new();
        sink.emit(&sample_signal()).unwrap();
        sink.emit(&sample_signal()).unwrap();
        assert_eq!(sink.signals.len(), 2);
    }

    #[test]
    fn test_csv_sink_writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!(
            "breakout_sink_test_{}_{}.csv",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or(0)
        ));

        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.emit(&sample_signal()).unwrap();
        }
        {
            // Reopening appends without a second header
            let mut sink = CsvSink::open(&path).unwrap();
            sink.emit(&sample_signal()).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("symbol,lookback,as_of"));
        assert!(lines[1].contains("TCS.NS"));
        assert!(lines[1].contains("fresh_high"));
        assert!(lines[1].contains("3912.50"));

        std::fs::remove_file(&path).ok();
    }
}
