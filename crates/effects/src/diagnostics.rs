//! Per-subsystem tick cost tracking.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Weight of the newest sample in the moving average.
pub const DEFAULT_SMOOTHING: f64 = 0.1;

/// Exponential moving average of how long each subsystem takes per tick.
#[derive(Debug, Clone)]
pub struct TickTimer {
    smoothing: f64,
    averages: BTreeMap<&'static str, f64>,
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

impl TickTimer {
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing: smoothing.clamp(f64::EPSILON, 1.0),
            averages: BTreeMap::new(),
        }
    }

    /// Run `f` and fold its duration into the average for `name`.
    pub fn time<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(name, start.elapsed());
        out
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        let sample = elapsed.as_secs_f64() * 1000.0;
        let alpha = self.smoothing;
        self.averages
            .entry(name)
            .and_modify(|avg| *avg += alpha * (sample - *avg))
            .or_insert(sample);
    }

    /// Smoothed cost in milliseconds.
    pub fn average_ms(&self, name: &str) -> Option<f64> {
        self.averages.get(name).copied()
    }

    pub fn averages(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.averages.iter().map(|(k, v)| (*k, *v))
    }

    pub fn log(&self) {
        for (name, ms) in self.averages() {
            debug!(subsystem = name, avg_ms = format_args!("{ms:.3}"), "Tick cost");
        }
    }

    pub fn reset(&mut self) {
        self.averages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_the_average() {
        let mut timer = TickTimer::new(0.5);
        timer.record("jets", Duration::from_millis(4));
        assert_eq!(timer.average_ms("jets"), Some(4.0));
        timer.record("jets", Duration::from_millis(2));
        assert_eq!(timer.average_ms("jets"), Some(3.0));
        assert_eq!(timer.average_ms("audio"), None);
    }

    #[test]
    fn time_returns_the_closure_value() {
        let mut timer = TickTimer::default();
        assert_eq!(timer.time("scan", || 7), 7);
        assert!(timer.average_ms("scan").is_some());
        timer.reset();
        assert_eq!(timer.averages().count(), 0);
    }
}
