// SPDX-License-Identifier: GPL-3.0-only

//! Control-port handler shared by every component

use crate::hal::{ControlBuffer, ControlHandler, PortLabel};
use crate::timing::TimingContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const NEVER: u64 = u64::MAX;

/// Logs each control notification and returns its header to the pool.
///
/// Holds no mutable state besides atomics, so one instance can be
/// registered on several components and fire from several driver threads.
#[derive(Debug)]
pub struct ControlLogger {
    timing: TimingContext,
    notifications: AtomicU64,
    /// Microseconds since start of the latest notification, or [`NEVER`]
    last_micros: AtomicU64,
}

impl ControlLogger {
    pub fn new(timing: TimingContext) -> Self {
        Self {
            timing,
            notifications: AtomicU64::new(0),
            last_micros: AtomicU64::new(NEVER),
        }
    }

    /// Notifications handled so far, across all components
    pub fn notification_count(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Offset from process start of the most recent notification
    pub fn last_notification(&self) -> Option<Duration> {
        match self.last_micros.load(Ordering::Relaxed) {
            NEVER => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }

    /// Record a notification now and return the gap since the previous one
    fn mark(&self) -> Option<Duration> {
        let now = u64::try_from(self.timing.elapsed().as_micros()).unwrap_or(NEVER - 1);
        match self.last_micros.swap(now, Ordering::Relaxed) {
            NEVER => None,
            previous => Some(Duration::from_micros(now.saturating_sub(previous))),
        }
    }
}

impl ControlHandler for ControlLogger {
    fn on_control(&self, port: &PortLabel, buffer: ControlBuffer) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        let gap = self.mark();
        info!("callback_control is called by {}", port);
        debug!(
            event = %buffer.event(),
            length = buffer.length(),
            since_previous = ?gap,
            "control notification"
        );
        buffer.release();
    }
}
