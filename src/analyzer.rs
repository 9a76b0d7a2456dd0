//! Rolling-window breakout analysis
//!
//! Pure evaluation of a bar series against a set of lookback windows. For
//! each lookback L the window is the trailing L bars ending just before the
//! latest bar, so the current close is always compared against prior
//! sessions only. The same slice supplies the window high and its date.

use tracing::debug;

use crate::types::{Bar, Signal, SignalKind, Symbol};

/// Relative tolerance for close-vs-high comparisons, so an exact retest of
/// the window high still counts as a fresh high despite representation error
const PRICE_EPSILON: f64 = 1e-9;

/// `a >= b` with epsilon tolerance
fn approx_ge(a: f64, b: f64) -> bool {
    a >= b - PRICE_EPSILON * b.abs().max(1.0)
}

/// Result of evaluating one symbol's bars
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Candidate signals, in lookback order
    pub signals: Vec<Signal>,
    /// Lookbacks skipped because the series was too short
    pub skipped: Vec<usize>,
}

/// Rolling window analyzer. Holds only configuration; evaluation is a pure
/// function of its inputs.
#[derive(Debug, Clone)]
pub struct Analyzer {
    lookbacks: Vec<usize>,
    volume_spike_threshold: Option<f64>,
    reversal_pullback: Option<f64>,
}

impl Analyzer {
    pub fn new(
        lookbacks: Vec<usize>,
        volume_spike_threshold: Option<f64>,
        reversal_pullback: Option<f64>,
    ) -> Self {
        Self {
            lookbacks,
            volume_spike_threshold,
            reversal_pullback,
        }
    }

    pub fn lookbacks(&self) -> &[usize] {
        &self.lookbacks
    }

    /// Evaluate the latest bar against every configured lookback.
    ///
    /// Requires bars sorted ascending by timestamp. A lookback with fewer
    /// than `L + 1` bars is skipped (recorded in `Evaluation::skipped`)
    /// without affecting the other lookbacks.
    pub fn evaluate(&self, symbol: &Symbol, bars: &[Bar]) -> Evaluation {
        let mut evaluation = Evaluation::default();

        let Some(current) = bars.last() else {
            evaluation.skipped.extend(self.lookbacks.iter().copied());
            return evaluation;
        };

        for &lookback in &self.lookbacks {
            if bars.len() < lookback + 1 {
                debug!(
                    "Insufficient data for {}: {} bars < lookback {} + 1",
                    symbol,
                    bars.len(),
                    lookback
                );
                evaluation.skipped.push(lookback);
                continue;
            }

            // Trailing L bars, exclusive of the current bar
            let window = &bars[bars.len() - 1 - lookback..bars.len() - 1];
            let (window_high, window_high_date) = window_max_high(window);

            if !self.volume_confirms(window, current) {
                continue;
            }

            if approx_ge(current.close, window_high) {
                evaluation.signals.push(Signal {
                    symbol: symbol.clone(),
                    lookback,
                    as_of: current.datetime,
                    close: current.close,
                    window_high,
                    window_high_date,
                    kind: SignalKind::FreshHigh,
                });
            } else if let Some(signal) = self.check_reversal(symbol, bars, lookback, current) {
                evaluation.signals.push(signal);
            }
        }

        evaluation
    }

    /// Reversal: the previous bar closed at/above its own prior-L-bar high
    /// and the current close fell below the configured fraction of that high
    fn check_reversal(
        &self,
        symbol: &Symbol,
        bars: &[Bar],
        lookback: usize,
        current: &Bar,
    ) -> Option<Signal> {
        let fraction = self.reversal_pullback?;
        if bars.len() < lookback + 2 {
            return None;
        }

        let prev = &bars[bars.len() - 2];
        let prev_window = &bars[bars.len() - 2 - lookback..bars.len() - 2];
        let (prev_high, prev_high_date) = window_max_high(prev_window);

        if approx_ge(prev.close, prev_high) && current.close < fraction * prev_high {
            return Some(Signal {
                symbol: symbol.clone(),
                lookback,
                as_of: current.datetime,
                close: current.close,
                window_high: prev_high,
                window_high_date: prev_high_date,
                kind: SignalKind::Reversal,
            });
        }

        None
    }

    /// Single optional volume gate: latest bar's volume must be at least the
    /// configured multiple of the window's average volume
    fn volume_confirms(&self, window: &[Bar], current: &Bar) -> bool {
        let Some(threshold) = self.volume_spike_threshold else {
            return true;
        };
        if window.is_empty() {
            return true;
        }

        let avg_volume: f64 =
            window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        if avg_volume <= 0.0 {
            return true;
        }

        current.volume >= threshold * avg_volume
    }
}

/// Max high over the window and the timestamp of the most recent bar
/// attaining it. Window must be non-empty.
fn window_max_high(window: &[Bar]) -> (f64, chrono::DateTime<chrono::Utc>) {
    let mut best = &window[0];
    for bar in &window[1..] {
        if bar.high >= best.high {
            best = bar;
        }
    }
    (best.high, best.datetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    /// Daily bars from (high, close) pairs; open/low derived, volume flat
    fn bars_from(values: &[(f64, f64)]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &(high, close))| {
                let low = close.min(high) * 0.9;
                Bar {
                    datetime: start + Duration::days(i as i64),
                    open: low + 0.1,
                    high,
                    low,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    fn analyzer(lookbacks: &[usize]) -> Analyzer {
        Analyzer::new(lookbacks.to_vec(), None, None)
    }

    #[test]
    fn test_no_signal_below_window_high() {
        // Closes [10,12,11,15,14], L=3: prior highs are [12,11,15], 14 < 15
        let bars = bars_from(&[(10.0, 10.0), (12.0, 12.0), (11.0, 11.0), (15.0, 15.0), (14.0, 14.0)]);
        let evaluation = analyzer(&[3]).evaluate(&Symbol::new("TCS.NS"), &bars);
        assert!(evaluation.signals.is_empty());
        assert!(evaluation.skipped.is_empty());
    }

    #[test]
    fn test_fresh_high_above_window_high() {
        // Closes [10,12,11,13,16], L=3: prior highs are [12,11,13], 16 >= 13
        let bars = bars_from(&[(10.0, 10.0), (12.0, 12.0), (11.0, 11.0), (13.0, 13.0), (16.0, 16.0)]);
        let evaluation = analyzer(&[3]).evaluate(&Symbol::new("TCS.NS"), &bars);
        assert_eq!(evaluation.signals.len(), 1);

        let signal = &evaluation.signals[0];
        assert_eq!(signal.kind, SignalKind::FreshHigh);
        assert_eq!(signal.lookback, 3);
        assert_relative_eq!(signal.window_high, 13.0);
        assert_relative_eq!(signal.close, 16.0);
        assert_eq!(signal.window_high_date, bars[3].datetime);
    }

    #[test]
    fn test_exact_equality_counts_as_fresh_high() {
        let bars = bars_from(&[(10.0, 10.0), (12.0, 12.0), (11.0, 11.0), (12.0, 12.0)]);
        let evaluation = analyzer(&[3]).evaluate(&Symbol::new("TCS.NS"), &bars);
        assert_eq!(evaluation.signals.len(), 1);
        assert_eq!(evaluation.signals[0].kind, SignalKind::FreshHigh);
    }

    #[test]
    fn test_insufficient_data_skips_only_that_lookback() {
        let bars = bars_from(&[(10.0, 10.0), (11.0, 11.0), (12.0, 12.0), (13.0, 13.0)]);
        let evaluation = analyzer(&[3, 10]).evaluate(&Symbol::new("TCS.NS"), &bars);
        // L=10 skipped, L=3 still evaluated: close 13 clears the prior
        // highs [10,11,12]
        assert_eq!(evaluation.skipped, vec![10]);
        assert_eq!(evaluation.signals.len(), 1);
        assert_eq!(evaluation.signals[0].lookback, 3);
    }

    #[test]
    fn test_empty_series_skips_everything() {
        let evaluation = analyzer(&[3, 5]).evaluate(&Symbol::new("TCS.NS"), &[]);
        assert!(evaluation.signals.is_empty());
        assert_eq!(evaluation.skipped, vec![3, 5]);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let bars = bars_from(&[(10.0, 10.0), (12.0, 12.0), (11.0, 11.0), (13.0, 13.0), (16.0, 16.0)]);
        let analyzer = analyzer(&[2, 3]);
        let symbol = Symbol::new("TCS.NS");

        let first = analyzer.evaluate(&symbol, &bars);
        let second = analyzer.evaluate(&symbol, &bars);
        assert_eq!(first.signals.len(), second.signals.len());
        for (a, b) in first.signals.iter().zip(&second.signals) {
            assert_eq!(a.lookback, b.lookback);
            assert_eq!(a.kind, b.kind);
            assert_relative_eq!(a.window_high, b.window_high);
        }
    }

    #[test]
    fn test_window_high_from_same_slice_per_lookback() {
        // Different lookbacks see different window highs
        let bars = bars_from(&[
            (20.0, 20.0),
            (10.0, 10.0),
            (11.0, 11.0),
            (12.0, 12.0),
            (13.0, 13.0),
        ]);
        let evaluation = analyzer(&[3, 4]).evaluate(&Symbol::new("TCS.NS"), &bars);

        // L=3 window highs [10,11,12] -> fresh high; L=4 includes the 20 spike
        assert_eq!(evaluation.signals.len(), 1);
        assert_eq!(evaluation.signals[0].lookback, 3);
        assert_relative_eq!(evaluation.signals[0].window_high, 12.0);
    }

    #[test]
    fn test_reversal_after_breakout() {
        // Bar n-2 closes at the prior high (12), current collapses to 10
        let bars = bars_from(&[
            (10.0, 10.0),
            (12.0, 12.0),
            (11.0, 11.0),
            (12.0, 12.0),
            (10.5, 10.0),
        ]);
        let analyzer = Analyzer::new(vec![3], None, Some(0.95));
        let evaluation = analyzer.evaluate(&Symbol::new("TCS.NS"), &bars);

        assert_eq!(evaluation.signals.len(), 1);
        let signal = &evaluation.signals[0];
        assert_eq!(signal.kind, SignalKind::Reversal);
        assert_relative_eq!(signal.window_high, 12.0);
        assert_relative_eq!(signal.close, 10.0);
    }

    #[test]
    fn test_no_reversal_when_disabled() {
        let bars = bars_from(&[
            (10.0, 10.0),
            (12.0, 12.0),
            (11.0, 11.0),
            (12.0, 12.0),
            (10.5, 10.0),
        ]);
        let evaluation = analyzer(&[3]).evaluate(&Symbol::new("TCS.NS"), &bars);
        assert!(evaluation.signals.is_empty());
    }

    #[test]
    fn test_shallow_pullback_is_not_a_reversal() {
        // Current close 11.9 stays above 0.95 * 12.0
        let bars = bars_from(&[
            (10.0, 10.0),
            (12.0, 12.0),
            (11.0, 11.0),
            (12.0, 12.0),
            (11.9, 11.9),
        ]);
        let analyzer = Analyzer::new(vec![3], None, Some(0.95));
        let evaluation = analyzer.evaluate(&Symbol::new("TCS.NS"), &bars);
        assert!(evaluation.signals.is_empty());
    }

    #[test]
    fn test_volume_filter_suppresses_quiet_breakouts() {
        let mut bars = bars_from(&[(10.0, 10.0), (11.0, 11.0), (12.0, 12.0), (13.0, 13.0)]);
        // Breakout bar trades at average volume only
        bars.last_mut().unwrap().volume = 1000.0;

        let gated = Analyzer::new(vec![3], Some(2.0), None);
        let evaluation = gated.evaluate(&Symbol::new("TCS.NS"), &bars);
        assert!(evaluation.signals.is_empty());

        // Doubling the breakout volume clears the 2x threshold
        bars.last_mut().unwrap().volume = 2000.0;
        let evaluation = gated.evaluate(&Symbol::new("TCS.NS"), &bars);
        assert_eq!(evaluation.signals.len(), 1);
    }
}
