// SPDX-License-Identifier: GPL-3.0-only

//! picam-tunnel - camera to dual-render capture pipeline
//!
//! Configures a Raspberry Pi camera and two video renderers, tunnels the
//! camera's preview and capture outputs straight into the renderers, and then
//! triggers a still capture every time the previous one has finished.
//! Image data never passes through this process; it only configures the
//! driver and polls the capture flag.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`hal`]: hardware abstraction layer contract and value types
//! - [`backends`]: simulated and MMAL implementations of the HAL
//! - [`pipeline`]: port configuration, connections, control handling and the capture cycle
//! - [`config`]: pipeline configuration and quirk validation
//! - [`constants`]: component names, formats and timing constants
//! - [`errors`]: driver status codes and pipeline errors
//! - [`timing`]: process-relative timestamps for diagnostics

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hal;
pub mod pipeline;
pub mod timing;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use errors::{PipelineError, PipelineResult, Status};
pub use pipeline::{CapturePipeline, ThreadSleeper};
pub use timing::TimingContext;
