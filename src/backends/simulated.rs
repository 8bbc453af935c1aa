// SPDX-License-Identifier: GPL-3.0-only

//! In-memory HAL
//!
//! Behaves like the VideoCore driver closely enough to exercise the pipeline
//! on any host: it knows the camera and renderer port layouts, enforces
//! macroblock alignment and tunnel format agreement, keeps the capture flag
//! busy for a configurable number of polls, and hands control notifications
//! to the registered handlers with pooled headers.
//!
//! Every primitive call is recorded, and any single call can be made to fail,
//! which is what the pipeline tests are built on.

use crate::constants::{CAMERA_COMPONENT, HEIGHT_ALIGNMENT, RENDER_COMPONENT, WIDTH_ALIGNMENT};
use crate::errors::{HalCall, Status};
use crate::hal::*;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Port layout of a known component: (inputs, outputs)
fn port_layout(name: &str) -> Option<(usize, usize)> {
    match name {
        CAMERA_COMPONENT => Some((0, 3)),
        RENDER_COMPONENT => Some((1, 0)),
        _ => None,
    }
}

/// Snapshot of a connection held by the simulated driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub output: PortRef,
    pub input: PortRef,
    pub flags: ConnectionFlags,
    pub enabled: bool,
}

/// Control header pool accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Headers handed to a control handler
    pub delivered: usize,
    /// Headers returned to the pool
    pub released: usize,
    /// Headers still held after their handler returned
    pub held_past_return: usize,
}

impl PoolStats {
    pub fn outstanding(&self) -> usize {
        self.delivered - self.released
    }
}

#[derive(Debug, Default)]
struct PoolCounters {
    delivered: AtomicUsize,
    released: AtomicUsize,
    held_past_return: AtomicUsize,
}

struct SimComponent {
    info: ComponentInfo,
    enabled: bool,
    control: Option<Arc<dyn ControlHandler>>,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    /// Fail the call at this position in the call log
    AtCall { index: usize, status: Status },
    /// Fail the nth call of this kind
    OnCall {
        call: HalCall,
        occurrence: usize,
        status: Status,
    },
}

#[derive(Default)]
struct State {
    next_component: u32,
    next_connection: u32,
    components: BTreeMap<ComponentId, SimComponent>,
    formats: HashMap<PortRef, PortFormat>,
    regions: HashMap<PortRef, DisplayRegion>,
    connections: BTreeMap<ConnectionId, ConnectionRecord>,
    calls: Vec<HalCall>,
    failures: Vec<Failure>,
    flag_script: VecDeque<bool>,
    busy_polls: u32,
    capturing: HashMap<PortRef, u32>,
    triggers: usize,
}

impl State {
    fn port_exists(&self, port: PortRef) -> bool {
        let Some(component) = self.components.get(&port.component) else {
            return false;
        };
        match port.direction {
            PortDirection::Control => port.index == 0,
            PortDirection::Input => port.index < component.info.inputs,
            PortDirection::Output => port.index < component.info.outputs,
        }
    }

    fn is_connected(&self, port: PortRef) -> bool {
        self.connections
            .values()
            .any(|c| c.output == port || c.input == port)
    }

    fn label(&self, port: PortRef) -> Option<PortLabel> {
        self.components
            .get(&port.component)
            .map(|c| c.info.label(&port))
    }
}

/// In-memory stand-in for the VideoCore HAL
pub struct SimulatedHal {
    state: Mutex<State>,
    pool: Arc<PoolCounters>,
}

impl Default for SimulatedHal {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHal {
    /// A HAL whose captures finish before the first poll
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            pool: Arc::new(PoolCounters::default()),
        }
    }

    /// A HAL whose captures stay in progress for `polls` status reads
    pub fn with_busy_polls(polls: u32) -> Self {
        let hal = Self::new();
        hal.lock().busy_polls = polls;
        hal
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call`, then apply any failure planned for it
    fn begin(&self, call: HalCall) -> Result<MutexGuard<'_, State>, Status> {
        let mut state = self.lock();
        let index = state.calls.len();
        let occurrence = state.calls.iter().filter(|c| **c == call).count();
        state.calls.push(call);

        let planned = state.failures.iter().find_map(|failure| match *failure {
            Failure::AtCall { index: i, status } if i == index => Some(status),
            Failure::OnCall {
                call: c,
                occurrence: n,
                status,
            } if c == call && n == occurrence => Some(status),
            _ => None,
        });
        match planned {
            Some(status) => {
                debug!("{} injected failure: {}", call, status);
                Err(status)
            }
            None => Ok(state),
        }
    }

    /// Fail the `occurrence`th (0-based) call of kind `call`
    pub fn fail_on(&self, call: HalCall, occurrence: usize, status: Status) {
        self.lock().failures.push(Failure::OnCall {
            call,
            occurrence,
            status,
        });
    }

    /// Fail whichever call lands at position `index` (0-based) in the call log
    pub fn fail_at(&self, index: usize, status: Status) {
        self.lock().failures.push(Failure::AtCall { index, status });
    }

    /// Answer the next capture-flag reads with `values`, in order
    pub fn script_capture_flag(&self, values: impl IntoIterator<Item = bool>) {
        self.lock().flag_script.extend(values);
    }

    /// Every primitive called so far, including failed ones
    pub fn calls(&self) -> Vec<HalCall> {
        self.lock().calls.clone()
    }

    pub fn components(&self) -> Vec<ComponentInfo> {
        self.lock()
            .components
            .values()
            .map(|c| c.info.clone())
            .collect()
    }

    pub fn is_enabled(&self, component: ComponentId) -> bool {
        self.lock()
            .components
            .get(&component)
            .is_some_and(|c| c.enabled)
    }

    pub fn has_control_handler(&self, component: ComponentId) -> bool {
        self.lock()
            .components
            .get(&component)
            .is_some_and(|c| c.control.is_some())
    }

    pub fn committed_format(&self, port: PortRef) -> Option<PortFormat> {
        self.lock().formats.get(&port).copied()
    }

    pub fn display_region(&self, port: PortRef) -> Option<DisplayRegion> {
        self.lock().regions.get(&port).copied()
    }

    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.lock().connections.values().copied().collect()
    }

    /// Times the capture flag was set to true
    pub fn capture_triggers(&self) -> usize {
        self.lock().triggers
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            delivered: self.pool.delivered.load(Ordering::SeqCst),
            released: self.pool.released.load(Ordering::SeqCst),
            held_past_return: self.pool.held_past_return.load(Ordering::SeqCst),
        }
    }

    /// Deliver a control notification as the driver would, on the calling thread
    pub fn notify(&self, component: ComponentId, cmd: u32) -> Result<(), Status> {
        let (handler, label) = {
            let state = self.lock();
            let component = state.components.get(&component).ok_or(Status::ENOENT)?;
            let handler = component.control.clone().ok_or(Status::ENOTCONN)?;
            (handler, component.info.label(&component.info.control()))
        };
        self.deliver(handler.as_ref(), &label, cmd);
        Ok(())
    }

    fn deliver(&self, handler: &dyn ControlHandler, label: &PortLabel, cmd: u32) {
        let returned = Arc::new(AtomicBool::new(false));
        self.pool.delivered.fetch_add(1, Ordering::SeqCst);

        let pool = Arc::clone(&self.pool);
        let flag = Arc::clone(&returned);
        let buffer = ControlBuffer::new(cmd, 0, move || {
            flag.store(true, Ordering::SeqCst);
            pool.released.fetch_add(1, Ordering::SeqCst);
        });
        handler.on_control(label, buffer);

        if !returned.load(Ordering::SeqCst) {
            self.pool.held_past_return.fetch_add(1, Ordering::SeqCst);
            warn!("{}: control header still held after callback returned", label);
        }
    }
}

impl MediaHal for SimulatedHal {
    fn create_component(&self, name: &str) -> HalStatus<ComponentInfo> {
        let mut state = self.begin(HalCall::CreateComponent)?;
        let (inputs, outputs) = port_layout(name).ok_or(Status::ENOENT)?;

        let id = ComponentId(state.next_component);
        state.next_component += 1;
        let info = ComponentInfo {
            id,
            name: name.to_string(),
            inputs,
            outputs,
        };
        state.components.insert(
            id,
            SimComponent {
                info: info.clone(),
                enabled: false,
                control: None,
            },
        );
        debug!("created {} as {:?}", name, id);
        Ok(info)
    }

    fn enable_control(
        &self,
        component: ComponentId,
        handler: Arc<dyn ControlHandler>,
    ) -> HalStatus<()> {
        let mut state = self.begin(HalCall::EnableControl)?;
        let component = state.components.get_mut(&component).ok_or(Status::ENOENT)?;
        if component.control.is_some() {
            return Err(Status::EISCONN);
        }
        component.control = Some(handler);
        Ok(())
    }

    fn commit_format(&self, port: PortRef, format: &PortFormat) -> HalStatus<()> {
        let mut state = self.begin(HalCall::CommitFormat)?;
        if !state.port_exists(port) || port.direction == PortDirection::Control {
            return Err(Status::EINVAL);
        }
        if state.is_connected(port) {
            return Err(Status::EISCONN);
        }
        let crop = format.crop;
        let aligned = format.width % WIDTH_ALIGNMENT == 0 && format.height % HEIGHT_ALIGNMENT == 0;
        let crop_fits = crop.x >= 0
            && crop.y >= 0
            && crop.x as u32 + crop.width <= format.width
            && crop.y as u32 + crop.height <= format.height;
        if format.width == 0 || format.height == 0 || !aligned || !crop_fits {
            return Err(Status::EINVAL);
        }
        state.formats.insert(port, *format);
        Ok(())
    }

    fn set_display_region(&self, port: PortRef, region: &DisplayRegion) -> HalStatus<()> {
        let mut state = self.begin(HalCall::SetDisplayRegion)?;
        if !state.port_exists(port) || port.direction != PortDirection::Input {
            return Err(Status::EINVAL);
        }
        state.regions.insert(port, *region);
        Ok(())
    }

    fn enable_component(&self, component: ComponentId) -> HalStatus<()> {
        let mut state = self.begin(HalCall::EnableComponent)?;
        let component = state.components.get_mut(&component).ok_or(Status::ENOENT)?;
        component.enabled = true;
        Ok(())
    }

    fn create_connection(
        &self,
        output: PortRef,
        input: PortRef,
        flags: ConnectionFlags,
    ) -> HalStatus<ConnectionId> {
        let mut state = self.begin(HalCall::CreateConnection)?;
        if !state.port_exists(output)
            || !state.port_exists(input)
            || output.direction != PortDirection::Output
            || input.direction != PortDirection::Input
            || output.component == input.component
        {
            return Err(Status::EINVAL);
        }
        if state.is_connected(output) || state.is_connected(input) {
            return Err(Status::EISCONN);
        }
        match (state.formats.get(&output), state.formats.get(&input)) {
            (Some(out_format), Some(in_format)) if out_format == in_format => {}
            _ => return Err(Status::ECONFIG),
        }

        let id = ConnectionId(state.next_connection);
        state.next_connection += 1;
        state.connections.insert(
            id,
            ConnectionRecord {
                id,
                output,
                input,
                flags,
                enabled: false,
            },
        );
        Ok(id)
    }

    fn enable_connection(&self, connection: ConnectionId) -> HalStatus<()> {
        let mut state = self.begin(HalCall::EnableConnection)?;
        let record = state.connections.get_mut(&connection).ok_or(Status::ENOENT)?;
        record.enabled = true;
        Ok(())
    }

    fn set_boolean(&self, port: PortRef, parameter: Parameter, value: bool) -> HalStatus<()> {
        let notification = {
            let mut state = self.begin(HalCall::SetBoolean)?;
            if !state.port_exists(port) || port.direction != PortDirection::Output {
                return Err(Status::EINVAL);
            }
            match parameter {
                Parameter::Capture if value => {
                    state.triggers += 1;
                    let busy = state.busy_polls;
                    state.capturing.insert(port, busy);
                }
                Parameter::Capture => {
                    state.capturing.remove(&port);
                }
            }
            // The camera reports the parameter change on its control port
            let control = PortRef::control(port.component);
            let handler = state
                .components
                .get(&port.component)
                .and_then(|c| c.control.clone());
            handler.zip(state.label(control))
        };

        if let Some((handler, label)) = notification {
            self.deliver(handler.as_ref(), &label, ControlEvent::PARAMETER_CHANGED);
        }
        Ok(())
    }

    fn get_boolean(&self, port: PortRef, parameter: Parameter) -> HalStatus<bool> {
        let mut state = self.begin(HalCall::GetBoolean)?;
        if !state.port_exists(port) || port.direction != PortDirection::Output {
            return Err(Status::EINVAL);
        }
        match parameter {
            Parameter::Capture => {
                if let Some(value) = state.flag_script.pop_front() {
                    return Ok(value);
                }
                match state.capturing.get(&port).copied() {
                    Some(remaining) if remaining > 0 => {
                        state.capturing.insert(port, remaining - 1);
                        Ok(true)
                    }
                    Some(_) => {
                        state.capturing.remove(&port);
                        Ok(false)
                    }
                    None => Ok(false),
                }
            }
        }
    }
}
