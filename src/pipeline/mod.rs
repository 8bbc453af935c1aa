// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline orchestration on top of the HAL
//!
//! # Modules
//!
//! - [`checked`]: fatal-on-failure wrapper recording the failing call site
//! - [`port`]: format alignment and commit
//! - [`control`]: control-port notification handler
//! - [`connection`]: tunnelled connections
//! - [`display`]: screen regions for the renderers
//! - [`cycle`]: capture trigger/poll state machine
//! - [`orchestrator`]: builds the pipeline and runs the cycle

pub mod checked;
pub mod connection;
pub mod control;
pub mod cycle;
pub mod display;
pub mod orchestrator;
pub mod port;

pub use checked::Checked;
pub use connection::{Connection, connect};
pub use control::ControlLogger;
pub use cycle::{CaptureCycle, CaptureState, Sleeper, ThreadSleeper};
pub use orchestrator::{CapturePipeline, PipelineStage, RenderSink};
pub use port::{ConfiguredPort, align_up, aligned_format, configure_port};
