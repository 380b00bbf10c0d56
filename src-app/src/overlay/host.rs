//! Window-system side of the overlay.

use super::scene::OverlayScene;
use super::OverlayId;
use extshot_types::{DisplayInfo, Point, Rect};
use std::fmt;

/// Error type for overlay creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// No overlay support on this platform or in this process
    Unavailable(String),
    /// The window system refused to create the surface
    PlatformError(String),
    /// The preset selection is larger than the display
    PresetTooLarge(String),
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayError::Unavailable(msg) => write!(f, "Overlay unavailable: {}", msg),
            OverlayError::PlatformError(msg) => write!(f, "Overlay error: {}", msg),
            OverlayError::PresetTooLarge(msg) => write!(f, "Preset too large: {}", msg),
        }
    }
}

impl std::error::Error for OverlayError {}

/// Where a surface's view sits, needed to map a view-local selection onto
/// the desktop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    /// Frame of the view inside its window
    pub view_frame: Rect,
    /// Origin of the window in global desktop coordinates (top-left origin)
    pub window_origin: Point,
    /// Whether selections from this surface use a bottom-left origin
    pub bottom_left_origin: bool,
}

/// A live, borderless, always-on-top selection surface.
///
/// Surfaces forward raw input as `AppEvent::OverlayInput` tagged with their
/// [`OverlayId`]; they hold no selection state of their own.
pub trait OverlaySurface {
    /// Replace what the surface shows.
    fn render(&mut self, scene: &OverlayScene);

    fn geometry(&self) -> SurfaceGeometry;

    /// Hide and release the surface. Safe to call more than once.
    fn close(&mut self);
}

/// Creates overlay surfaces.
pub trait OverlayHost {
    /// Open a surface covering `display`, tagged with `id`.
    fn open(
        &mut self,
        id: OverlayId,
        display: &DisplayInfo,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError>;
}

/// Host for processes without a window system; every open fails.
pub struct HeadlessHost;

impl OverlayHost for HeadlessHost {
    fn open(
        &mut self,
        _id: OverlayId,
        _display: &DisplayInfo,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError> {
        Err(OverlayError::Unavailable(
            "no window system available".to_string(),
        ))
    }
}
