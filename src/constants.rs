// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants
//!
//! These are design constants, not tunables. Two of them encode driver quirks
//! that constrain the legal configuration space; see [`CAPTURE_INTERVAL`] and
//! [`CAPTURE_ENCODING`].

use crate::hal::Encoding;
use std::time::Duration;

/// Registry name of the camera component
pub const CAMERA_COMPONENT: &str = "vc.ril.camera";

/// Registry name of the video render component
pub const RENDER_COMPONENT: &str = "vc.ril.video_render";

/// Camera output port carrying the continuous preview stream
pub const CAMERA_PREVIEW_PORT: usize = 0;

/// Camera output port carrying still captures
pub const CAMERA_CAPTURE_PORT: usize = 2;

/// Renderer input port fed by the tunnel
pub const RENDER_INPUT_PORT: usize = 0;

/// Preview stream encoding
pub const PREVIEW_ENCODING: Encoding = Encoding::I420;
/// Preview stream width
pub const PREVIEW_WIDTH: u32 = 1024;
/// Preview stream height
pub const PREVIEW_HEIGHT: u32 = 768;

/// Capture stream encoding.
///
/// Must stay uncompressed: with [`Encoding::Opaque`] the driver stops
/// producing buffers after the first capture.
pub const CAPTURE_ENCODING: Encoding = Encoding::Rgb24;
/// Capture stream width
pub const CAPTURE_WIDTH: u32 = 512;
/// Capture stream height
pub const CAPTURE_HEIGHT: u32 = 512;

/// Logical screen shared by both renderers
pub const SCREEN_WIDTH: u32 = 640;
/// Logical screen height
pub const SCREEN_HEIGHT: u32 = 480;

/// Delay between capture-status polls.
///
/// At 100 ms exposure is never controlled on the IMX219 sensor.
pub const CAPTURE_INTERVAL: Duration = Duration::from_millis(1000);

/// Frame widths are padded to whole macroblock columns
pub const WIDTH_ALIGNMENT: u32 = 32;

/// Frame heights are padded to whole macroblock rows
pub const HEIGHT_ALIGNMENT: u32 = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_port_is_distinct_from_preview() {
        assert_ne!(CAMERA_PREVIEW_PORT, CAMERA_CAPTURE_PORT);
    }

    #[test]
    fn test_quirk_constants() {
        assert_eq!(CAPTURE_INTERVAL, Duration::from_millis(1000));
        assert!(CAPTURE_ENCODING.is_uncompressed());
    }
}
