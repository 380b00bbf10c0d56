//! Region selection overlay.
//!
//! [`SelectionOverlay`] is the platform-neutral model behind the full-screen
//! selection surface: a fixed-size rectangle the user drags around and
//! confirms with a double-click or dismisses with Escape. Coordinates are
//! view-local logical points with a top-left origin.
//!
//! The model never talks to the window system. Hosts feed it
//! [`OverlayInput`]s and act on the returned [`OverlayResponse`].

pub mod host;
pub mod scene;

pub use host::{HeadlessHost, OverlayError, OverlayHost, OverlaySurface, SurfaceGeometry};
pub use scene::{Color, OverlayScene};

use extshot_types::{Point, PresetSize, Rect, Size};
use std::time::Duration;

/// Maximum gap between two presses that counts as a double-click.
pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(500);

/// Delay after which a new surface is considered ready for input, and the
/// retry interval for confirmations that arrive before that.
pub const READINESS_DELAY: Duration = Duration::from_millis(200);

/// Retries of an early confirmation before it is honoured regardless.
pub const MAX_READINESS_RETRIES: u32 = 5;

/// Identifies one overlay instance; events for a closed overlay are dropped.
pub type OverlayId = u64;

/// Raw input forwarded by a host surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayInput {
    /// Primary button pressed. `timestamp` is any monotonic event time.
    PointerDown { location: Point, timestamp: Duration },
    PointerDragged { location: Point },
    PointerUp,
    Escape,
}

/// How an overlay ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayOutcome {
    /// The selection, in view coordinates
    Finalized(Rect),
    Cancelled,
}

/// What the host should do after feeding the model an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayResponse {
    /// Nothing changed
    None,
    /// The selection moved
    Redraw,
    /// The overlay is done; no further input will be accepted
    Emit(OverlayOutcome),
    /// The surface is not ready yet; call [`SelectionOverlay::retry_pending`]
    /// after [`READINESS_DELAY`]
    Defer,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    outcome: OverlayOutcome,
    retries: u32,
}

/// Selection state for one overlay surface.
#[derive(Debug, Clone)]
pub struct SelectionOverlay {
    surface: Size,
    preset: PresetSize,
    selection: Rect,
    /// Pointer position minus selection origin, while dragging
    drag_offset: Option<Point>,
    last_press: Option<Duration>,
    ready: bool,
    pending: Option<Pending>,
    finished: bool,
}

impl SelectionOverlay {
    /// Create a model for a surface of `surface` points with the selection
    /// centred.
    ///
    /// Fails when the preset does not fit on the surface.
    pub fn new(surface: Size, preset: PresetSize) -> Result<Self, OverlayError> {
        let size = preset.size();
        if size.width > surface.width || size.height > surface.height {
            return Err(OverlayError::PresetTooLarge(format!(
                "{} selection does not fit on a {}x{} display",
                preset, surface.width, surface.height
            )));
        }
        let origin = Point::new(
            (surface.width - size.width) / 2.0,
            (surface.height - size.height) / 2.0,
        );
        Ok(Self {
            surface,
            preset,
            selection: Rect::from_origin_size(origin, size),
            drag_offset: None,
            last_press: None,
            ready: false,
            pending: None,
            finished: false,
        })
    }

    pub fn preset(&self) -> PresetSize {
        self.preset
    }

    /// Current selection in view coordinates.
    pub fn selection(&self) -> Rect {
        self.selection
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_offset.is_some()
    }

    /// True once an outcome has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mark the surface as able to take confirmations.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Feed one input event to the model.
    pub fn handle_input(&mut self, input: OverlayInput) -> OverlayResponse {
        if self.finished || self.pending.is_some() {
            return OverlayResponse::None;
        }
        match input {
            OverlayInput::PointerDown {
                location,
                timestamp,
            } => self.pointer_down(location, timestamp),
            OverlayInput::PointerDragged { location } => self.pointer_dragged(location),
            OverlayInput::PointerUp => {
                self.drag_offset = None;
                OverlayResponse::None
            }
            OverlayInput::Escape => {
                self.drag_offset = None;
                self.request(OverlayOutcome::Cancelled)
            }
        }
    }

    /// Re-attempt a confirmation that arrived before the surface was ready.
    ///
    /// After [`MAX_READINESS_RETRIES`] the confirmation goes through anyway.
    pub fn retry_pending(&mut self) -> OverlayResponse {
        let Some(mut pending) = self.pending.take() else {
            return OverlayResponse::None;
        };
        pending.retries += 1;
        if self.ready || pending.retries >= MAX_READINESS_RETRIES {
            self.finished = true;
            return OverlayResponse::Emit(pending.outcome);
        }
        self.pending = Some(pending);
        OverlayResponse::Defer
    }

    /// Drawing instructions for the current state.
    pub fn scene(&self) -> OverlayScene {
        OverlayScene::new(self.surface, self.selection)
    }

    fn pointer_down(&mut self, location: Point, timestamp: Duration) -> OverlayResponse {
        if !self.selection.contains(location) {
            self.last_press = None;
            self.drag_offset = None;
            return OverlayResponse::None;
        }

        let is_double_click = self
            .last_press
            .and_then(|prev| timestamp.checked_sub(prev))
            .is_some_and(|gap| gap <= DOUBLE_CLICK_INTERVAL);
        if is_double_click {
            self.last_press = None;
            self.drag_offset = None;
            return self.request(OverlayOutcome::Finalized(self.selection));
        }

        self.last_press = Some(timestamp);
        self.drag_offset = Some(Point::new(
            location.x - self.selection.x(),
            location.y - self.selection.y(),
        ));
        OverlayResponse::None
    }

    fn pointer_dragged(&mut self, location: Point) -> OverlayResponse {
        let Some(offset) = self.drag_offset else {
            return OverlayResponse::None;
        };
        let max_x = (self.surface.width - self.selection.width()).max(0.0);
        let max_y = (self.surface.height - self.selection.height()).max(0.0);
        let origin = Point::new(
            (location.x - offset.x).clamp(0.0, max_x),
            (location.y - offset.y).clamp(0.0, max_y),
        );
        if origin == self.selection.origin {
            return OverlayResponse::None;
        }
        self.selection.origin = origin;
        OverlayResponse::Redraw
    }

    fn request(&mut self, outcome: OverlayOutcome) -> OverlayResponse {
        if self.ready {
            self.finished = true;
            OverlayResponse::Emit(outcome)
        } else {
            self.pending = Some(Pending {
                outcome,
                retries: 0,
            });
            OverlayResponse::Defer
        }
    }
}
