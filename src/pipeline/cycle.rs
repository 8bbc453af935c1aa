// SPDX-License-Identifier: GPL-3.0-only

//! Timed capture trigger/poll cycle
//!
//! The camera owns the real capture state; the orchestrator only flips the
//! capture flag on and then polls it. The cycle alternates forever:
//!
//! ```text
//!            set flag = true
//!   ┌──────────────┐ ───────────────► ┌──────────────────┐
//!   │  Capturing   │                  │  Polling{polls}  │ ◄─┐ sleep, flag == true
//!   └──────────────┘ ◄─────────────── └──────────────────┘ ──┘
//!                    sleep, flag == false
//! ```
//!
//! One [`CaptureCycle::step`] performs exactly one arrow, so the interval and
//! the transition conditions can be driven one at a time.

use super::checked::Checked;
use crate::errors::HalError;
use crate::hal::{MediaHal, Parameter, PortRef};
use std::time::Duration;
use tracing::{debug, info};

/// Blocks the orchestrator between polls
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Where the cycle is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Next step triggers a capture
    Capturing,
    /// Capture triggered; `polls` reads have come back true since.
    /// Saturates at `u32::MAX` if the flag never clears.
    Polling { polls: u32 },
}

/// Trigger/poll state machine for one capture port
#[derive(Debug, Clone)]
pub struct CaptureCycle {
    port: PortRef,
    interval: Duration,
    state: CaptureState,
    captures: u64,
    polls: u64,
}

impl CaptureCycle {
    /// Start in [`CaptureState::Capturing`]
    pub fn new(port: PortRef, interval: Duration) -> Self {
        Self {
            port,
            interval,
            state: CaptureState::Capturing,
            captures: 0,
            polls: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Capture triggers issued so far
    pub fn captures_triggered(&self) -> u64 {
        self.captures
    }

    /// Status polls issued so far
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Perform one transition and return the new state
    pub fn step<H: MediaHal + ?Sized>(
        &mut self,
        hal: Checked<'_, H>,
        sleeper: &mut dyn Sleeper,
    ) -> Result<CaptureState, HalError> {
        self.state = match self.state {
            CaptureState::Capturing => {
                info!("Setting capture parameter to TRUE");
                hal.set_boolean(self.port, Parameter::Capture, true)?;
                self.captures += 1;
                CaptureState::Polling { polls: 0 }
            }
            CaptureState::Polling { polls } => {
                sleeper.sleep(self.interval);
                let in_progress = hal.get_boolean(self.port, Parameter::Capture)?;
                self.polls += 1;
                let polls = polls.saturating_add(1);
                if in_progress {
                    CaptureState::Polling { polls }
                } else {
                    debug!(polls, "capture finished");
                    CaptureState::Capturing
                }
            }
        };
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::SimulatedHal;
    use crate::errors::{HalCall, Status};

    #[derive(Default)]
    struct CountingSleeper {
        sleeps: Vec<Duration>,
    }

    impl Sleeper for CountingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
        }
    }

    fn capture_port(hal: &SimulatedHal) -> PortRef {
        let camera = Checked::new(hal).create_component("vc.ril.camera").unwrap();
        camera.output(2).unwrap()
    }

    #[test]
    fn test_trigger_then_poll_until_false() {
        let hal = SimulatedHal::new();
        let port = capture_port(&hal);
        hal.script_capture_flag([true, true, false]);
        let mut cycle = CaptureCycle::new(port, Duration::from_millis(1000));
        let mut sleeper = CountingSleeper::default();
        let checked = Checked::new(&hal);

        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Polling { polls: 0 }
        );
        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Polling { polls: 1 }
        );
        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Polling { polls: 2 }
        );
        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Capturing
        );

        assert_eq!(sleeper.sleeps, vec![Duration::from_millis(1000); 3]);
        assert_eq!(cycle.captures_triggered(), 1);
        assert_eq!(cycle.polls(), 3);
    }

    #[test]
    fn test_capturing_does_not_sleep() {
        let hal = SimulatedHal::new();
        let port = capture_port(&hal);
        let mut cycle = CaptureCycle::new(port, Duration::from_millis(1000));
        let mut sleeper = CountingSleeper::default();

        cycle.step(Checked::new(&hal), &mut sleeper).unwrap();
        assert!(sleeper.sleeps.is_empty());
        assert_eq!(hal.capture_triggers(), 1);
    }

    #[test]
    fn test_poll_failure_leaves_state() {
        let hal = SimulatedHal::new();
        let port = capture_port(&hal);
        let mut cycle = CaptureCycle::new(port, Duration::from_millis(1000));
        let mut sleeper = CountingSleeper::default();
        hal.fail_on(HalCall::GetBoolean, 0, Status::EIO);

        cycle.step(Checked::new(&hal), &mut sleeper).unwrap();
        let err = cycle.step(Checked::new(&hal), &mut sleeper).unwrap_err();
        assert_eq!(err.call, HalCall::GetBoolean);
        assert_eq!(cycle.state(), CaptureState::Polling { polls: 0 });
    }

    #[test]
    fn test_poll_count_saturates_while_flag_stays_set() {
        let hal = SimulatedHal::new();
        let port = capture_port(&hal);
        hal.script_capture_flag([true, true, false]);
        let mut cycle = CaptureCycle::new(port, Duration::from_millis(1));
        let mut sleeper = CountingSleeper::default();
        let checked = Checked::new(&hal);

        cycle.state = CaptureState::Polling { polls: u32::MAX - 1 };
        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Polling { polls: u32::MAX }
        );
        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Polling { polls: u32::MAX }
        );
        assert_eq!(
            cycle.step(checked, &mut sleeper).unwrap(),
            CaptureState::Capturing
        );
        assert_eq!(cycle.polls(), 3);
    }
}
