// SPDX-License-Identifier: GPL-3.0-only

//! Screen placement for the two renderers

use crate::config::ScreenSettings;
use crate::hal::{DisplayRegion, Rect};

/// Left half of the screen; takes the smaller half when the width is odd
pub fn left_half(screen: &ScreenSettings) -> Rect {
    Rect::new(0, 0, screen.width / 2, screen.height)
}

/// Right half of the screen, starting where [`left_half`] ends
pub fn right_half(screen: &ScreenSettings) -> Rect {
    let split = screen.width / 2;
    Rect::new(split as i32, 0, screen.width - split, screen.height)
}

/// Windowed region showing the preview renderer
pub fn preview_region(screen: &ScreenSettings) -> DisplayRegion {
    DisplayRegion::windowed(left_half(screen))
}

/// Windowed region showing the capture renderer
pub fn capture_region(screen: &ScreenSettings) -> DisplayRegion {
    DisplayRegion::windowed(right_half(screen))
}
