//! Capture requests.

use crate::geometry::PixelRect;
use crate::preset::PresetSize;
use serde::{Deserialize, Serialize};

/// A finalized selection, ready to be captured.
///
/// Built once when the user confirms a selection and moved into the capture
/// session, which consumes it. Fields are private so a request cannot be
/// altered after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    rect: PixelRect,
    display_id: u32,
    preset: PresetSize,
}

impl CaptureRequest {
    pub fn new(rect: PixelRect, display_id: u32, preset: PresetSize) -> Self {
        Self {
            rect,
            display_id,
            preset,
        }
    }

    /// Region to capture, in device pixels of the target display.
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn display_id(&self) -> u32 {
        self.display_id
    }

    pub fn preset(&self) -> PresetSize {
        self.preset
    }
}
