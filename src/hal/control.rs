// SPDX-License-Identifier: GPL-3.0-only

//! Control-port notifications
//!
//! The driver delivers out-of-band events (errors, parameter changes, format
//! changes) on each component's control port, from its own thread. Every
//! notification borrows a header from a driver pool; [`ControlBuffer`] owns that
//! loan and hands it back when released or dropped, so a handler can never
//! return with the header still outstanding.

use super::types::{PortLabel, fourcc};
use std::fmt;

/// Event codes carried in a control buffer's `cmd` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Error,
    EndOfStream,
    FormatChanged,
    ParameterChanged,
    Other(u32),
}

impl ControlEvent {
    pub const ERROR: u32 = fourcc(b"ERRO");
    pub const EOS: u32 = fourcc(b"EEOS");
    pub const FORMAT_CHANGED: u32 = fourcc(b"EFCH");
    pub const PARAMETER_CHANGED: u32 = fourcc(b"EPCH");

    pub fn from_cmd(cmd: u32) -> Self {
        match cmd {
            Self::ERROR => ControlEvent::Error,
            Self::EOS => ControlEvent::EndOfStream,
            Self::FORMAT_CHANGED => ControlEvent::FormatChanged,
            Self::PARAMETER_CHANGED => ControlEvent::ParameterChanged,
            other => ControlEvent::Other(other),
        }
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlEvent::Error => write!(f, "error"),
            ControlEvent::EndOfStream => write!(f, "end of stream"),
            ControlEvent::FormatChanged => write!(f, "format changed"),
            ControlEvent::ParameterChanged => write!(f, "parameter changed"),
            ControlEvent::Other(cmd) => write!(f, "event 0x{:08x}", cmd),
        }
    }
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A notification header on loan from the driver's pool
pub struct ControlBuffer {
    cmd: u32,
    length: u32,
    release: Option<ReleaseFn>,
}

impl ControlBuffer {
    /// Wrap a pool header; `release` returns it to the pool and runs exactly once
    pub fn new(cmd: u32, length: u32, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cmd,
            length,
            release: Some(Box::new(release)),
        }
    }

    pub fn cmd(&self) -> u32 {
        self.cmd
    }

    pub fn event(&self) -> ControlEvent {
        ControlEvent::from_cmd(self.cmd)
    }

    /// Payload bytes attached to the event
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Hand the header back to the driver's pool
    pub fn release(mut self) {
        self.return_to_pool();
    }

    fn return_to_pool(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ControlBuffer {
    fn drop(&mut self) {
        self.return_to_pool();
    }
}

impl fmt::Debug for ControlBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBuffer")
            .field("event", &self.event())
            .field("length", &self.length)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Receiver of control-port notifications.
///
/// Called on the driver's execution context, possibly concurrently for
/// different components, so implementations must be thread-safe.
pub trait ControlHandler: Send + Sync {
    fn on_control(&self, port: &PortLabel, buffer: ControlBuffer);
}
