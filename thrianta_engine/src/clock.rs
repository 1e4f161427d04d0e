//! Frame clock
//!
//! Measures elapsed wall time since `start`; the application loop derives
//! the per-frame delta from successive `elapsed` readings.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the clock and reset the elapsed time
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.elapsed = Duration::ZERO;
    }

    /// Refresh the elapsed time. No effect on a stopped clock.
    pub fn update(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed = start.elapsed();
        }
    }

    /// Stop the clock. The last elapsed value is kept.
    pub fn stop(&mut self) {
        self.start_time = None;
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    /// Elapsed seconds as of the last `update`
    pub fn elapsed(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
