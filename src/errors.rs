// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline
//!
//! There is one failure class at runtime: a HAL primitive returned a
//! non-success status. It is never retried; the binary logs the call site and
//! status and exits with failure. Configuration and topology errors are the
//! same class caught before the driver sees the request.

use crate::hal::Encoding;
use std::fmt;
use std::panic::Location;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Raw status code returned by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const ENOMEM: Status = Status(1);
    pub const ENOSPC: Status = Status(2);
    pub const EINVAL: Status = Status(3);
    pub const ENOSYS: Status = Status(4);
    pub const ENOENT: Status = Status(5);
    pub const ENXIO: Status = Status(6);
    pub const EIO: Status = Status(7);
    pub const ESPIPE: Status = Status(8);
    pub const ECORRUPT: Status = Status(9);
    pub const ENOTREADY: Status = Status(10);
    pub const ECONFIG: Status = Status(11);
    pub const EISCONN: Status = Status(12);
    pub const ENOTCONN: Status = Status(13);
    pub const EAGAIN: Status = Status(14);
    pub const EFAULT: Status = Status(15);

    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }

    /// Map a raw driver code onto `Ok` / `Err(Status)`
    pub fn into_result(self) -> Result<(), Status> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }

    fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "success",
            1 => "out of memory",
            2 => "out of resources",
            3 => "invalid argument",
            4 => "not implemented",
            5 => "no such entry",
            6 => "no such device",
            7 => "I/O error",
            8 => "illegal seek",
            9 => "data corrupt",
            10 => "not ready",
            11 => "bad configuration",
            12 => "already connected",
            13 => "not connected",
            14 => "try again",
            15 => "bad address",
            _ => return None,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)?;
        if let Some(name) = self.name() {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

/// The HAL primitive that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalCall {
    CreateComponent,
    EnableControl,
    CommitFormat,
    SetDisplayRegion,
    EnableComponent,
    CreateConnection,
    EnableConnection,
    SetBoolean,
    GetBoolean,
}

impl fmt::Display for HalCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HalCall::CreateComponent => "component_create",
            HalCall::EnableControl => "port_enable(control)",
            HalCall::CommitFormat => "port_format_commit",
            HalCall::SetDisplayRegion => "port_parameter_set(displayregion)",
            HalCall::EnableComponent => "component_enable",
            HalCall::CreateConnection => "connection_create",
            HalCall::EnableConnection => "connection_enable",
            HalCall::SetBoolean => "port_parameter_set_boolean",
            HalCall::GetBoolean => "port_parameter_get_boolean",
        };
        f.write_str(name)
    }
}

/// A HAL primitive failed at a known call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalError {
    pub call: HalCall,
    pub status: Status,
    pub location: &'static Location<'static>,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} failed: {}",
            self.location.file(),
            self.location.line(),
            self.call,
            self.status
        )
    }
}

/// Pipeline configuration rejected before touching the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Capture port given a GPU-native encoding; the driver freezes after one capture
    OpaqueCaptureEncoding(Encoding),
    /// Poll interval of zero
    ZeroInterval,
    /// A stream was requested with zero width or height
    EmptyStream(&'static str),
    /// A stream size that overflows once padded to macroblock alignment
    OversizedStream(&'static str),
    /// Preview and capture configured onto the same camera output
    SharedCameraPort(usize),
    /// Logical screen cannot be split into two halves
    InvalidScreen { width: u32, height: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OpaqueCaptureEncoding(encoding) => write!(
                f,
                "capture encoding {} is not uncompressed; the camera stops after the first capture",
                encoding
            ),
            ConfigError::ZeroInterval => write!(f, "capture interval must be non-zero"),
            ConfigError::EmptyStream(stream) => write!(f, "{} stream has an empty size", stream),
            ConfigError::OversizedStream(stream) => {
                write!(f, "{} stream is too large to pad to macroblock alignment", stream)
            }
            ConfigError::SharedCameraPort(port) => {
                write!(f, "preview and capture both use camera output {}", port)
            }
            ConfigError::InvalidScreen { width, height } => {
                write!(f, "screen {}x{} cannot be split in two", width, height)
            }
        }
    }
}

/// Main pipeline error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A driver call failed
    Hal(HalError),
    /// Invalid pipeline configuration
    Config(ConfigError),
    /// Ports or connections do not fit together
    Topology(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Hal(e) => write!(f, "{}", e),
            PipelineError::Config(e) => write!(f, "Configuration error: {}", e),
            PipelineError::Topology(msg) => write!(f, "Topology error: {}", msg),
        }
    }
}

impl std::error::Error for HalError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Hal(e) => Some(e),
            PipelineError::Config(e) => Some(e),
            PipelineError::Topology(_) => None,
        }
    }
}

impl From<HalError> for PipelineError {
    fn from(err: HalError) -> Self {
        PipelineError::Hal(err)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}
