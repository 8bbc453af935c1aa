// SPDX-License-Identifier: GPL-3.0-only

//! Concrete HAL implementations
//!
//! - [`simulated`]: in-memory driver, used off-target and by the tests
//! - `mmal`: VideoCore MMAL bindings (feature `mmal`, Raspberry Pi only)

#[cfg(all(feature = "mmal", any(target_arch = "arm", target_arch = "aarch64")))]
pub mod mmal;
pub mod simulated;

use crate::hal::MediaHal;
use std::fmt;

/// Which HAL the binary drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// In-memory driver; captures finish after one busy poll
    Simulated,
    /// VideoCore MMAL
    Mmal,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::Simulated => write!(f, "simulated"),
            BackendType::Mmal => write!(f, "MMAL"),
        }
    }
}

/// Backend compiled into this build
pub fn default_backend_type() -> BackendType {
    if cfg!(all(feature = "mmal", any(target_arch = "arm", target_arch = "aarch64"))) {
        BackendType::Mmal
    } else {
        BackendType::Simulated
    }
}

/// Instantiate the backend compiled into this build
pub fn default_backend() -> Box<dyn MediaHal> {
    #[cfg(all(feature = "mmal", any(target_arch = "arm", target_arch = "aarch64")))]
    {
        Box::new(mmal::MmalHal::new())
    }
    #[cfg(not(all(feature = "mmal", any(target_arch = "arm", target_arch = "aarch64"))))]
    {
        Box::new(simulated::SimulatedHal::with_busy_polls(1))
    }
}
