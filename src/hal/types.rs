// SPDX-License-Identifier: GPL-3.0-only

//! Value types shared by every HAL implementation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Build a driver FourCC from four ASCII bytes (first byte in the low bits)
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

/// Pixel encodings the pipeline knows how to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Planar YUV 4:2:0
    I420,
    /// Packed 24-bit RGB
    Rgb24,
    /// Packed 24-bit BGR
    Bgr24,
    /// Packed 32-bit RGBA
    Rgba,
    /// GPU-native handle, never mapped to user space
    Opaque,
}

impl Encoding {
    /// Driver FourCC for this encoding
    pub const fn fourcc(self) -> u32 {
        match self {
            Encoding::I420 => fourcc(b"I420"),
            Encoding::Rgb24 => fourcc(b"RGB3"),
            Encoding::Bgr24 => fourcc(b"BGR3"),
            Encoding::Rgba => fourcc(b"RGBA"),
            Encoding::Opaque => fourcc(b"OPQV"),
        }
    }

    /// Whether frames carry plain pixel data rather than a GPU handle
    pub const fn is_uncompressed(self) -> bool {
        !matches!(self, Encoding::Opaque)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::I420 => "I420",
            Encoding::Rgb24 => "RGB24",
            Encoding::Bgr24 => "BGR24",
            Encoding::Rgba => "RGBA",
            Encoding::Opaque => "OPAQUE",
        };
        write!(f, "{}", name)
    }
}

/// Handle to a component created by the HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

/// Handle to a connection created by the HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

/// Direction of a port relative to its component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Control,
    Input,
    Output,
}

impl PortDirection {
    /// Short tag used in driver port names
    pub fn tag(self) -> &'static str {
        match self {
            PortDirection::Control => "ctr",
            PortDirection::Input => "in",
            PortDirection::Output => "out",
        }
    }
}

/// Address of one port on one component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub component: ComponentId,
    pub direction: PortDirection,
    pub index: usize,
}

impl PortRef {
    pub fn control(component: ComponentId) -> Self {
        Self {
            component,
            direction: PortDirection::Control,
            index: 0,
        }
    }

    pub fn input(component: ComponentId, index: usize) -> Self {
        Self {
            component,
            direction: PortDirection::Input,
            index,
        }
    }

    pub fn output(component: ComponentId, index: usize) -> Self {
        Self {
            component,
            direction: PortDirection::Output,
            index,
        }
    }
}

/// Human-readable port name, e.g. `vc.ril.camera:out:2`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortLabel(String);

impl PortLabel {
    pub fn new(component_name: &str, direction: PortDirection, index: usize) -> Self {
        Self(format!("{}:{}:{}", component_name, direction.tag(), index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PortLabel {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for PortLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the HAL reports back after creating a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub name: String,
    pub inputs: usize,
    pub outputs: usize,
}

impl ComponentInfo {
    pub fn control(&self) -> PortRef {
        PortRef::control(self.id)
    }

    /// Input port `index`, if the component has one
    pub fn input(&self, index: usize) -> Option<PortRef> {
        (index < self.inputs).then(|| PortRef::input(self.id, index))
    }

    /// Output port `index`, if the component has one
    pub fn output(&self, index: usize) -> Option<PortRef> {
        (index < self.outputs).then(|| PortRef::output(self.id, index))
    }

    pub fn label(&self, port: &PortRef) -> PortLabel {
        PortLabel::new(&self.name, port.direction, port.index)
    }
}

/// Rectangle in pixels; origin may be negative on some displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the two rectangles share at least one pixel
    pub fn overlaps(&self, other: &Rect) -> bool {
        let (ax1, ay1) = (i64::from(self.x), i64::from(self.y));
        let (ax2, ay2) = (ax1 + i64::from(self.width), ay1 + i64::from(self.height));
        let (bx1, by1) = (i64::from(other.x), i64::from(other.y));
        let (bx2, by2) = (bx1 + i64::from(other.width), by1 + i64::from(other.height));
        ax1 < bx2 && bx1 < ax2 && ay1 < by2 && by1 < ay2
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Elementary-stream video format of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortFormat {
    pub encoding: Encoding,
    /// Buffer width including alignment padding
    pub width: u32,
    /// Buffer height including alignment padding
    pub height: u32,
    /// Region of the buffer holding valid pixels
    pub crop: Rect,
}

impl fmt::Display for PortFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} (crop {})",
            self.encoding, self.width, self.height, self.crop
        )
    }
}

/// Which fields of a [`DisplayRegion`] the renderer should apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplaySet(u32);

impl DisplaySet {
    pub const NUM: DisplaySet = DisplaySet(1 << 0);
    pub const FULLSCREEN: DisplaySet = DisplaySet(1 << 1);
    pub const TRANSFORM: DisplaySet = DisplaySet(1 << 2);
    pub const DEST_RECT: DisplaySet = DisplaySet(1 << 3);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: DisplaySet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DisplaySet {
    type Output = DisplaySet;

    fn bitor(self, rhs: DisplaySet) -> DisplaySet {
        DisplaySet(self.0 | rhs.0)
    }
}

/// Screen placement of a renderer's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRegion {
    pub fullscreen: bool,
    pub dest_rect: Rect,
    pub set: DisplaySet,
}

impl DisplayRegion {
    /// Windowed output restricted to `dest_rect`
    pub fn windowed(dest_rect: Rect) -> Self {
        Self {
            fullscreen: false,
            dest_rect,
            set: DisplaySet::FULLSCREEN | DisplaySet::DEST_RECT,
        }
    }
}

/// Flags passed when creating a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionFlags(u32);

impl ConnectionFlags {
    /// Buffers move port to port inside the driver, never through user space
    pub const TUNNELLING: ConnectionFlags = ConnectionFlags(1 << 0);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_tunnelled(self) -> bool {
        self.0 & Self::TUNNELLING.0 != 0
    }
}

/// Port parameters the orchestrator reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Boolean capture trigger / in-progress flag on the still port
    Capture,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Capture => write!(f, "capture"),
        }
    }
}
