// SPDX-License-Identifier: GPL-3.0-only

//! Fatal-on-failure view of a HAL
//!
//! Every primitive goes through [`Checked`], which turns a raw [`Status`] into
//! a [`HalError`] carrying the caller's file and line. Callers short-circuit
//! with `?`; nothing below the orchestrator inspects status codes.

use crate::errors::{HalCall, HalError, Status};
use crate::hal::*;
use std::panic::Location;
use std::sync::Arc;

fn check<T>(
    result: Result<T, Status>,
    call: HalCall,
    location: &'static Location<'static>,
) -> Result<T, HalError> {
    result.map_err(|status| HalError {
        call,
        status,
        location,
    })
}

/// Borrowed HAL whose calls fail with a located [`HalError`]
pub struct Checked<'a, H: MediaHal + ?Sized> {
    hal: &'a H,
}

impl<'a, H: MediaHal + ?Sized> Clone for Checked<'a, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, H: MediaHal + ?Sized> Copy for Checked<'a, H> {}

impl<'a, H: MediaHal + ?Sized> Checked<'a, H> {
    pub fn new(hal: &'a H) -> Self {
        Self { hal }
    }

    #[track_caller]
    pub fn create_component(&self, name: &str) -> Result<ComponentInfo, HalError> {
        let location = Location::caller();
        check(
            self.hal.create_component(name),
            HalCall::CreateComponent,
            location,
        )
    }

    #[track_caller]
    pub fn enable_control(
        &self,
        component: ComponentId,
        handler: Arc<dyn ControlHandler>,
    ) -> Result<(), HalError> {
        let location = Location::caller();
        check(
            self.hal.enable_control(component, handler),
            HalCall::EnableControl,
            location,
        )
    }

    #[track_caller]
    pub fn commit_format(&self, port: PortRef, format: &PortFormat) -> Result<(), HalError> {
        let location = Location::caller();
        check(
            self.hal.commit_format(port, format),
            HalCall::CommitFormat,
            location,
        )
    }

    #[track_caller]
    pub fn set_display_region(
        &self,
        port: PortRef,
        region: &DisplayRegion,
    ) -> Result<(), HalError> {
        let location = Location::caller();
        check(
            self.hal.set_display_region(port, region),
            HalCall::SetDisplayRegion,
            location,
        )
    }

    #[track_caller]
    pub fn enable_component(&self, component: ComponentId) -> Result<(), HalError> {
        let location = Location::caller();
        check(
            self.hal.enable_component(component),
            HalCall::EnableComponent,
            location,
        )
    }

    #[track_caller]
    pub fn create_connection(
        &self,
        output: PortRef,
        input: PortRef,
        flags: ConnectionFlags,
    ) -> Result<ConnectionId, HalError> {
        let location = Location::caller();
        check(
            self.hal.create_connection(output, input, flags),
            HalCall::CreateConnection,
            location,
        )
    }

    #[track_caller]
    pub fn enable_connection(&self, connection: ConnectionId) -> Result<(), HalError> {
        let location = Location::caller();
        check(
            self.hal.enable_connection(connection),
            HalCall::EnableConnection,
            location,
        )
    }

    #[track_caller]
    pub fn set_boolean(
        &self,
        port: PortRef,
        parameter: Parameter,
        value: bool,
    ) -> Result<(), HalError> {
        let location = Location::caller();
        check(
            self.hal.set_boolean(port, parameter, value),
            HalCall::SetBoolean,
            location,
        )
    }

    #[track_caller]
    pub fn get_boolean(&self, port: PortRef, parameter: Parameter) -> Result<bool, HalError> {
        let location = Location::caller();
        check(
            self.hal.get_boolean(port, parameter),
            HalCall::GetBoolean,
            location,
        )
    }
}
