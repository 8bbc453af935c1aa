// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::*;
use crate::errors::ConfigError;
use crate::hal::Encoding;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Format requested for one camera stream and the renderer that shows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Camera output port index
    pub port: usize,
    /// Pixel encoding on both ends of the tunnel
    pub encoding: Encoding,
    /// Requested (unpadded) width
    pub width: u32,
    /// Requested (unpadded) height
    pub height: u32,
}

impl StreamSettings {
    /// Both dimensions can be padded to macroblock alignment without overflow
    pub fn fits_alignment(&self) -> bool {
        self.width.checked_next_multiple_of(WIDTH_ALIGNMENT).is_some()
            && self.height.checked_next_multiple_of(HEIGHT_ALIGNMENT).is_some()
    }
}

/// Logical screen the two renderers share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSettings {
    pub width: u32,
    pub height: u32,
}

/// Everything the orchestrator needs to build the pipeline.
///
/// Built from [`crate::constants`]; the binary never reads it from the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Camera component registry name
    pub camera_component: String,
    /// Render component registry name
    pub render_component: String,
    /// Continuous preview stream, shown on the left half
    pub preview: StreamSettings,
    /// Still capture stream, shown on the right half
    pub capture: StreamSettings,
    /// Renderer input fed by each tunnel
    pub render_input: usize,
    pub screen: ScreenSettings,
    /// Sleep between capture-status polls
    #[serde(with = "millis")]
    pub capture_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_component: CAMERA_COMPONENT.to_string(),
            render_component: RENDER_COMPONENT.to_string(),
            preview: StreamSettings {
                port: CAMERA_PREVIEW_PORT,
                encoding: PREVIEW_ENCODING,
                width: PREVIEW_WIDTH,
                height: PREVIEW_HEIGHT,
            },
            capture: StreamSettings {
                port: CAMERA_CAPTURE_PORT,
                encoding: CAPTURE_ENCODING,
                width: CAPTURE_WIDTH,
                height: CAPTURE_HEIGHT,
            },
            render_input: RENDER_INPUT_PORT,
            screen: ScreenSettings {
                width: SCREEN_WIDTH,
                height: SCREEN_HEIGHT,
            },
            capture_interval: CAPTURE_INTERVAL,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the driver is known to mishandle
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.capture.encoding.is_uncompressed() {
            return Err(ConfigError::OpaqueCaptureEncoding(self.capture.encoding));
        }
        if self.capture_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(ConfigError::EmptyStream("preview"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::EmptyStream("capture"));
        }
        if !self.preview.fits_alignment() {
            return Err(ConfigError::OversizedStream("preview"));
        }
        if !self.capture.fits_alignment() {
            return Err(ConfigError::OversizedStream("capture"));
        }
        if self.preview.port == self.capture.port {
            return Err(ConfigError::SharedCameraPort(self.preview.port));
        }
        if self.screen.width < 2 || self.screen.height == 0 {
            return Err(ConfigError::InvalidScreen {
                width: self.screen.width,
                height: self.screen.height,
            });
        }
        if self.capture_interval < CAPTURE_INTERVAL {
            warn!(
                "capture interval of {} ms is below {} ms; auto-exposure may not converge",
                self.capture_interval.as_millis(),
                CAPTURE_INTERVAL.as_millis()
            );
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
