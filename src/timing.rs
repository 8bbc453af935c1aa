// SPDX-License-Identifier: GPL-3.0-only

//! Process-relative timestamps for diagnostics
//!
//! The start instant is fixed when the context is created and never changes,
//! so copies can be handed to the log formatter and to every control handler
//! without synchronisation.

use std::fmt;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Read-only reference point for `<relative-seconds>:` prefixes
#[derive(Debug, Clone, Copy)]
pub struct TimingContext {
    start: Instant,
}

impl TimingContext {
    /// Start the clock now
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Seconds since start, with microsecond resolution
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl FormatTime for TimingContext {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{:.6}:", self.elapsed_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_is_monotonic() {
        let timing = TimingContext::start();
        let first = timing.elapsed_secs();
        let copy = timing;
        assert!(copy.elapsed_secs() >= first);
    }

    #[test]
    fn test_prefix_format() {
        let timing = TimingContext::start();
        let mut line = String::new();
        timing.format_time(&mut Writer::new(&mut line)).unwrap();
        assert!(line.ends_with(':'));
        assert!(line.starts_with("0."));
    }
}
