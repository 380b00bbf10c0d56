//! Display descriptions.

use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Information about a connected display.
///
/// Position and size are in logical points of the global desktop space
/// (top-left origin), matching what Core Graphics reports for display bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Platform display identifier
    pub id: u32,
    /// Display name for UI
    pub name: String,
    /// Desktop X position (logical coordinates)
    pub x: f64,
    /// Desktop Y position (logical coordinates)
    pub y: f64,
    /// Width in logical points
    pub width: f64,
    /// Height in logical points
    pub height: f64,
    /// Backing scale factor (e.g., 2.0 for Retina displays)
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Whether this is the primary display
    pub is_primary: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl DisplayInfo {
    pub fn frame(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Width of the display's frame buffer in device pixels.
    pub fn pixel_width(&self) -> u32 {
        (self.width * self.scale_factor).floor() as u32
    }

    /// Height of the display's frame buffer in device pixels.
    pub fn pixel_height(&self) -> u32 {
        (self.height * self.scale_factor).floor() as u32
    }
}

/// Screen geometry needed to turn a global selection into device pixels.
///
/// Derived once per capture from the display the overlay is shown on and
/// read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenTransformContext {
    /// Origin of the display in global logical coordinates
    pub origin: Point,
    /// Size of the display in logical points
    pub size: Size,
    /// Device pixels per logical point
    pub scale_factor: f64,
}

impl ScreenTransformContext {
    pub fn new(origin: Point, size: Size, scale_factor: f64) -> Self {
        Self {
            origin,
            size,
            scale_factor,
        }
    }

    pub fn from_display(display: &DisplayInfo) -> Self {
        Self::new(
            Point::new(display.x, display.y),
            Size::new(display.width, display.height),
            display.scale_factor,
        )
    }
}
