//! Monotonic wall-clock timer used to stamp the simulated timeline.
//!
//! The clock is deliberately *not* virtualized: every delay the engine
//! reports is real elapsed time, so that two runs of the same metadata
//! program against the same configuration produce timeline lines that only
//! differ in nondeterministic interrupt interleaving, never in magnitude.

use std::time::{Duration, Instant};

/// A single process-wide monotonic clock with a zeroable epoch.
#[derive(Debug)]
pub struct SimClock {
    epoch: Instant,
}

impl SimClock {
    /// Creates a clock whose epoch is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Resets the epoch to now and returns the canonical zero timestamp.
    pub fn zero(&mut self) -> String {
        self.epoch = Instant::now();
        format_seconds(Duration::ZERO)
    }

    /// Returns the elapsed time since the last `zero()` as a 6-decimal
    /// seconds string, left-padded to match the reference trace's column
    /// width.
    #[must_use]
    pub fn lap(&self) -> String {
        format_seconds(self.epoch.elapsed())
    }

    /// Busy/sleep-waits for exactly `ms` real milliseconds.
    pub fn sleep_ms(ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a duration as seconds with six fractional digits, e.g.
/// `"12.345678"`. Callers own the two-space left pad and trailing `", "`
/// that show up in assembled timeline lines — those belong to the line
/// format, not the timestamp itself.
fn format_seconds(d: Duration) -> String {
    format!("{:.6}", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_reports_zero_seconds() {
        let mut clock = SimClock::new();
        let ts = clock.zero();
        assert_eq!(ts, "0.000000", "zero() must report exactly zero, with no padding wider than the value needs");
    }

    #[test]
    fn lap_reports_six_decimal_digits() {
        let mut clock = SimClock::new();
        clock.zero();
        let ts = clock.lap();
        let fractional = ts.split('.').nth(1).expect("lap output has a decimal point");
        assert_eq!(fractional.len(), 6);
    }

    #[test]
    fn sleep_ms_waits_at_least_the_requested_duration() {
        let mut clock = SimClock::new();
        clock.zero();
        SimClock::sleep_ms(15);
        let elapsed: f64 = clock.lap().trim().parse().unwrap();
        assert!(elapsed >= 0.015);
    }
}
