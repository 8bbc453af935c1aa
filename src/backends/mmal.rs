// SPDX-License-Identifier: GPL-3.0-only

//! VideoCore MMAL backend
//!
//! Thin binding of the [`MediaHal`] primitives onto `libmmal`. Components and
//! connections are never destroyed: the driver objects, and the control
//! contexts attached to their ports, live until the process exits.

use crate::errors::Status;
use crate::hal::*;
use mmal_sys as ffi;
use std::ffi::{CStr, CString};
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

fn check(status: ffi::MMAL_STATUS_T) -> HalStatus<()> {
    Status(status as u32).into_result()
}

struct ComponentPtr(NonNull<ffi::MMAL_COMPONENT_T>);

// The driver serialises access to its own objects; we only hand pointers to it
unsafe impl Send for ComponentPtr {}

struct ConnectionPtr(NonNull<ffi::MMAL_CONNECTION_T>);

unsafe impl Send for ConnectionPtr {}

/// Buffer header on loan to a control handler
struct HeaderPtr(*mut ffi::MMAL_BUFFER_HEADER_T);

unsafe impl Send for HeaderPtr {}

impl HeaderPtr {
    fn release(self) {
        unsafe { ffi::mmal_buffer_header_release(self.0) };
    }
}

/// Attached to a control port's userdata; leaked for the port's lifetime
struct ControlContext {
    handler: Arc<dyn ControlHandler>,
    label: PortLabel,
}

unsafe extern "C" fn control_callback(
    port: *mut ffi::MMAL_PORT_T,
    buffer: *mut ffi::MMAL_BUFFER_HEADER_T,
) {
    let header = HeaderPtr(buffer);
    let (cmd, length, context) = unsafe {
        (
            (*buffer).cmd,
            (*buffer).length,
            ((*port).userdata as *const ControlContext).as_ref(),
        )
    };

    match context {
        Some(context) => {
            let buffer = ControlBuffer::new(cmd, length, move || header.release());
            context.handler.on_control(&context.label, buffer);
        }
        None => header.release(),
    }
}

#[derive(Default)]
struct Registry {
    components: Vec<ComponentPtr>,
    connections: Vec<ConnectionPtr>,
}

/// HAL backed by the Raspberry Pi MMAL library
#[derive(Default)]
pub struct MmalHal {
    registry: Mutex<Registry>,
}

impl MmalHal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn component(&self, id: ComponentId) -> HalStatus<*mut ffi::MMAL_COMPONENT_T> {
        self.lock()
            .components
            .get(id.0 as usize)
            .map(|c| c.0.as_ptr())
            .ok_or(Status::ENOENT)
    }

    fn port(&self, port: PortRef) -> HalStatus<*mut ffi::MMAL_PORT_T> {
        let component = self.component(port.component)?;
        unsafe {
            let (ports, count) = match port.direction {
                PortDirection::Control => return Ok((*component).control),
                PortDirection::Input => ((*component).input, (*component).input_num),
                PortDirection::Output => ((*component).output, (*component).output_num),
            };
            if port.index >= count as usize {
                return Err(Status::EINVAL);
            }
            Ok(*ports.add(port.index))
        }
    }
}

impl MediaHal for MmalHal {
    fn create_component(&self, name: &str) -> HalStatus<ComponentInfo> {
        let c_name = CString::new(name).map_err(|_| Status::EINVAL)?;
        let mut raw: *mut ffi::MMAL_COMPONENT_T = ptr::null_mut();
        check(unsafe { ffi::mmal_component_create(c_name.as_ptr(), &mut raw) })?;
        let component = NonNull::new(raw).ok_or(Status::ENOMEM)?;

        let (inputs, outputs) = unsafe {
            let c = component.as_ptr();
            ((*c).input_num as usize, (*c).output_num as usize)
        };

        let mut registry = self.lock();
        let id = ComponentId(registry.components.len() as u32);
        registry.components.push(ComponentPtr(component));
        info!("{} created ({} in, {} out)", name, inputs, outputs);

        Ok(ComponentInfo {
            id,
            name: name.to_string(),
            inputs,
            outputs,
        })
    }

    fn enable_control(
        &self,
        component: ComponentId,
        handler: Arc<dyn ControlHandler>,
    ) -> HalStatus<()> {
        let port = self.port(PortRef::control(component))?;
        let name = unsafe { CStr::from_ptr((*port).name) };
        let label = PortLabel::from(name.to_string_lossy().into_owned());
        let context = Box::into_raw(Box::new(ControlContext { handler, label }));

        unsafe {
            (*port).userdata = context as *mut ffi::MMAL_PORT_USERDATA_T;
            let status = ffi::mmal_port_enable(port, Some(control_callback));
            if let Err(status) = check(status) {
                (*port).userdata = ptr::null_mut();
                drop(Box::from_raw(context));
                return Err(status);
            }
        }
        Ok(())
    }

    fn commit_format(&self, port: PortRef, format: &PortFormat) -> HalStatus<()> {
        let port = self.port(port)?;
        unsafe {
            let es_format = (*port).format;
            (*es_format).encoding = format.encoding.fourcc();
            let video = &mut (*(*es_format).es).video;
            video.width = format.width;
            video.height = format.height;
            video.crop.x = format.crop.x;
            video.crop.y = format.crop.y;
            video.crop.width = format.crop.width as i32;
            video.crop.height = format.crop.height as i32;
            check(ffi::mmal_port_format_commit(port))
        }
    }

    fn set_display_region(&self, port: PortRef, region: &DisplayRegion) -> HalStatus<()> {
        let port = self.port(port)?;
        unsafe {
            let mut param: ffi::MMAL_DISPLAYREGION_T = mem::zeroed();
            param.hdr.id = ffi::MMAL_PARAMETER_DISPLAYREGION as _;
            param.hdr.size = mem::size_of::<ffi::MMAL_DISPLAYREGION_T>() as _;
            param.set = region.set.bits() as _;
            param.fullscreen = region.fullscreen as _;
            param.dest_rect.x = region.dest_rect.x;
            param.dest_rect.y = region.dest_rect.y;
            param.dest_rect.width = region.dest_rect.width as i32;
            param.dest_rect.height = region.dest_rect.height as i32;
            check(ffi::mmal_port_parameter_set(port, &mut param.hdr))
        }
    }

    fn enable_component(&self, component: ComponentId) -> HalStatus<()> {
        let component = self.component(component)?;
        check(unsafe { ffi::mmal_component_enable(component) })
    }

    fn create_connection(
        &self,
        output: PortRef,
        input: PortRef,
        flags: ConnectionFlags,
    ) -> HalStatus<ConnectionId> {
        let (output, input) = (self.port(output)?, self.port(input)?);
        let mut raw: *mut ffi::MMAL_CONNECTION_T = ptr::null_mut();
        check(unsafe { ffi::mmal_connection_create(&mut raw, output, input, flags.bits() as _) })?;
        let connection = NonNull::new(raw).ok_or(Status::ENOMEM)?;

        let mut registry = self.lock();
        let id = ConnectionId(registry.connections.len() as u32);
        registry.connections.push(ConnectionPtr(connection));
        debug!("connection {:?} created", id);
        Ok(id)
    }

    fn enable_connection(&self, connection: ConnectionId) -> HalStatus<()> {
        let connection = self
            .lock()
            .connections
            .get(connection.0 as usize)
            .map(|c| c.0.as_ptr())
            .ok_or(Status::ENOENT)?;
        check(unsafe { ffi::mmal_connection_enable(connection) })
    }

    fn set_boolean(&self, port: PortRef, parameter: Parameter, value: bool) -> HalStatus<()> {
        let port = self.port(port)?;
        let id = match parameter {
            Parameter::Capture => ffi::MMAL_PARAMETER_CAPTURE,
        };
        check(unsafe { ffi::mmal_port_parameter_set_boolean(port, id as _, value as _) })
    }

    fn get_boolean(&self, port: PortRef, parameter: Parameter) -> HalStatus<bool> {
        let port = self.port(port)?;
        let id = match parameter {
            Parameter::Capture => ffi::MMAL_PARAMETER_CAPTURE,
        };
        let mut value: ffi::MMAL_BOOL_T = 0;
        check(unsafe { ffi::mmal_port_parameter_get_boolean(port, id as _, &mut value) })?;
        Ok(value != 0)
    }
}
