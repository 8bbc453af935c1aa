// SPDX-License-Identifier: GPL-3.0-only

//! Hardware abstraction layer contract
//!
//! The pipeline only configures components; format negotiation, buffer pools
//! and tunnelling all live below this trait. Every primitive is synchronous
//! and reports the raw driver [`Status`] on failure. The one asynchronous path
//! is the [`ControlHandler`] registered per control port.
//!
//! ```text
//! ┌──────────────────────┐
//! │  Capture Orchestrator │
//! └──────────┬───────────┘
//!            │ Checked<H>  (status → HalError, call site recorded)
//!            ▼
//! ┌──────────────────────┐
//! │    MediaHal trait     │
//! └──────────┬───────────┘
//!       ┌────┴──────┐
//!       ▼           ▼
//!   Simulated     MMAL
//! ```

pub mod control;
pub mod types;

pub use control::{ControlBuffer, ControlEvent, ControlHandler};
pub use types::*;

use crate::errors::Status;
use std::sync::Arc;

/// Raw result of a HAL primitive
pub type HalStatus<T> = Result<T, Status>;

/// Primitives the pipeline consumes from the hardware layer
pub trait MediaHal: Send + Sync {
    /// Create a component by registry name
    fn create_component(&self, name: &str) -> HalStatus<ComponentInfo>;

    /// Enable the control port and route its notifications to `handler`
    fn enable_control(
        &self,
        component: ComponentId,
        handler: Arc<dyn ControlHandler>,
    ) -> HalStatus<()>;

    /// Write `format` to the port and commit it to the driver
    fn commit_format(&self, port: PortRef, format: &PortFormat) -> HalStatus<()>;

    /// Set the display-region parameter on a renderer input
    fn set_display_region(&self, port: PortRef, region: &DisplayRegion) -> HalStatus<()>;

    fn enable_component(&self, component: ComponentId) -> HalStatus<()>;

    /// Link `output` to `input`
    fn create_connection(
        &self,
        output: PortRef,
        input: PortRef,
        flags: ConnectionFlags,
    ) -> HalStatus<ConnectionId>;

    fn enable_connection(&self, connection: ConnectionId) -> HalStatus<()>;

    fn set_boolean(&self, port: PortRef, parameter: Parameter, value: bool) -> HalStatus<()>;

    fn get_boolean(&self, port: PortRef, parameter: Parameter) -> HalStatus<bool>;
}
