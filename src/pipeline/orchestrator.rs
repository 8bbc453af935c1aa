// SPDX-License-Identifier: GPL-3.0-only

//! Capture orchestrator
//!
//! Builds the camera → two renderers pipeline and then drives the capture
//! cycle forever:
//!
//! ```text
//!                       ┌────────────────────────┐
//!   camera out:0 ══════►│ render 1 (left half)    │   preview, I420
//!                       └────────────────────────┘
//!                       ┌────────────────────────┐
//!   camera out:2 ══════►│ render 2 (right half)   │   capture, RGB24
//!                       └────────────────────────┘
//!   ═══ tunnelled, buffers never leave the driver
//! ```
//!
//! The pipeline is never torn down explicitly: it lives until the process
//! exits, and any failure while building or running it is fatal.

use super::checked::Checked;
use super::connection::{Connection, connect};
use super::control::ControlLogger;
use super::cycle::{CaptureCycle, Sleeper};
use super::display;
use super::port::{ConfiguredPort, configure_port};
use crate::config::{PipelineConfig, StreamSettings};
use crate::errors::{PipelineError, PipelineResult};
use crate::hal::{ComponentInfo, DisplayRegion, MediaHal, PortRef};
use crate::timing::TimingContext;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Setup phase reached by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Creating and configuring components
    Initializing,
    /// All components enabled; wiring connections
    PipelineReady,
    /// Connections enabled; capture cycle may run
    Running,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Initializing => write!(f, "initializing"),
            PipelineStage::PipelineReady => write!(f, "pipeline ready"),
            PipelineStage::Running => write!(f, "running"),
        }
    }
}

/// A renderer with its configured input
#[derive(Debug, Clone)]
pub struct RenderSink {
    pub component: ComponentInfo,
    pub input: ConfiguredPort,
    pub region: DisplayRegion,
}

/// Fully wired pipeline, owned for the life of the process
#[derive(Debug)]
pub struct CapturePipeline {
    camera: ComponentInfo,
    preview: ConfiguredPort,
    capture: ConfiguredPort,
    preview_sink: RenderSink,
    capture_sink: RenderSink,
    connections: [Connection; 2],
    control: Arc<ControlLogger>,
    cycle: CaptureCycle,
}

fn missing_port(component: &ComponentInfo, kind: &str, index: usize) -> PipelineError {
    PipelineError::Topology(format!(
        "{} has no {} port {}",
        component.name, kind, index
    ))
}

fn output_port(component: &ComponentInfo, index: usize) -> PipelineResult<PortRef> {
    component
        .output(index)
        .ok_or_else(|| missing_port(component, "output", index))
}

fn input_port(component: &ComponentInfo, index: usize) -> PipelineResult<PortRef> {
    component
        .input(index)
        .ok_or_else(|| missing_port(component, "input", index))
}

/// Create a renderer, match its input to `stream`, and place it on screen
fn setup_render<H: MediaHal + ?Sized>(
    hal: Checked<'_, H>,
    config: &PipelineConfig,
    stream: &StreamSettings,
    region: DisplayRegion,
    control: &Arc<ControlLogger>,
) -> PipelineResult<RenderSink> {
    let render = hal.create_component(&config.render_component)?;
    hal.enable_control(render.id, control.clone())?;

    let input = input_port(&render, config.render_input)?;
    let input = configure_port(
        hal,
        &render,
        input,
        stream.encoding,
        stream.width,
        stream.height,
    )?;
    hal.set_display_region(input.port, &region)?;
    hal.enable_component(render.id)?;

    info!("{} placed at {}", input.label, region.dest_rect);
    Ok(RenderSink {
        component: render,
        input,
        region,
    })
}

impl CapturePipeline {
    /// Build and wire the whole pipeline.
    ///
    /// Stops at the first failing driver call; nothing after it is attempted.
    pub fn initialize<H: MediaHal + ?Sized>(
        hal: &H,
        config: &PipelineConfig,
        timing: TimingContext,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let hal = Checked::new(hal);
        let control = Arc::new(ControlLogger::new(timing));

        info!("Pipeline {}", PipelineStage::Initializing);

        let camera = hal.create_component(&config.camera_component)?;
        hal.enable_control(camera.id, control.clone())?;
        let preview_port = output_port(&camera, config.preview.port)?;
        let preview = configure_port(
            hal,
            &camera,
            preview_port,
            config.preview.encoding,
            config.preview.width,
            config.preview.height,
        )?;
        let capture_port = output_port(&camera, config.capture.port)?;
        let capture = configure_port(
            hal,
            &camera,
            capture_port,
            config.capture.encoding,
            config.capture.width,
            config.capture.height,
        )?;
        hal.enable_component(camera.id)?;
        debug!("{} enabled", camera.name);

        let preview_sink = setup_render(
            hal,
            config,
            &config.preview,
            display::preview_region(&config.screen),
            &control,
        )?;
        let capture_sink = setup_render(
            hal,
            config,
            &config.capture,
            display::capture_region(&config.screen),
            &control,
        )?;

        info!("Pipeline {}", PipelineStage::PipelineReady);

        let preview_link = connect(hal, &preview, &preview_sink.input)?;
        let capture_link = connect(hal, &capture, &capture_sink.input)?;

        info!("Pipeline {}", PipelineStage::Running);

        Ok(Self {
            cycle: CaptureCycle::new(capture.port, config.capture_interval),
            camera,
            preview,
            capture,
            preview_sink,
            capture_sink,
            connections: [preview_link, capture_link],
            control,
        })
    }

    pub fn camera(&self) -> &ComponentInfo {
        &self.camera
    }

    pub fn preview_port(&self) -> &ConfiguredPort {
        &self.preview
    }

    pub fn capture_port(&self) -> &ConfiguredPort {
        &self.capture
    }

    pub fn preview_sink(&self) -> &RenderSink {
        &self.preview_sink
    }

    pub fn capture_sink(&self) -> &RenderSink {
        &self.capture_sink
    }

    /// Preview link first, then capture link
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Control notifications seen on any component
    pub fn control_notifications(&self) -> u64 {
        self.control.notification_count()
    }

    pub fn cycle(&self) -> &CaptureCycle {
        &self.cycle
    }

    pub fn cycle_mut(&mut self) -> &mut CaptureCycle {
        &mut self.cycle
    }

    /// Drive the capture cycle until a driver call fails
    pub fn run<H: MediaHal + ?Sized>(
        &mut self,
        hal: &H,
        sleeper: &mut dyn Sleeper,
    ) -> PipelineResult<Infallible> {
        let hal = Checked::new(hal);
        loop {
            self.cycle.step(hal, sleeper)?;
        }
    }
}
