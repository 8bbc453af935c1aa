// SPDX-License-Identifier: GPL-3.0-only

//! Tunnelled port-to-port connections
//!
//! A connection is created and enabled in one step: either both succeed or
//! the caller gets an error and aborts. Buffers on a tunnel never reach user
//! space, so the connection owns nothing but its driver handle.

use super::checked::Checked;
use super::port::ConfiguredPort;
use crate::errors::{PipelineError, PipelineResult};
use crate::hal::{ConnectionFlags, ConnectionId, MediaHal, PortDirection, PortLabel};
use std::fmt;
use tracing::info;

/// An enabled, tunnelled link between two ports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: PortLabel,
    pub sink: PortLabel,
    pub flags: ConnectionFlags,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.sink)
    }
}

fn check_endpoints(output: &ConfiguredPort, input: &ConfiguredPort) -> PipelineResult<()> {
    if output.port.direction != PortDirection::Output {
        return Err(PipelineError::Topology(format!(
            "{} is not an output port",
            output.label
        )));
    }
    if input.port.direction != PortDirection::Input {
        return Err(PipelineError::Topology(format!(
            "{} is not an input port",
            input.label
        )));
    }
    if output.port.component == input.port.component {
        return Err(PipelineError::Topology(format!(
            "{} and {} belong to the same component",
            output.label, input.label
        )));
    }
    if output.format != input.format {
        return Err(PipelineError::Topology(format!(
            "format mismatch: {} is {}, {} is {}",
            output.label, output.format, input.label, input.format
        )));
    }
    Ok(())
}

/// Tunnel `output` into `input` and enable the link.
///
/// Both ports must already carry committed, identical formats.
#[track_caller]
pub fn connect<H: MediaHal + ?Sized>(
    hal: Checked<'_, H>,
    output: &ConfiguredPort,
    input: &ConfiguredPort,
) -> PipelineResult<Connection> {
    check_endpoints(output, input)?;

    let flags = ConnectionFlags::TUNNELLING;
    let id = hal.create_connection(output.port, input.port, flags)?;
    hal.enable_connection(id)?;

    let connection = Connection {
        id,
        source: output.label.clone(),
        sink: input.label.clone(),
        flags,
    };
    info!("Connected {}", connection);
    Ok(connection)
}
