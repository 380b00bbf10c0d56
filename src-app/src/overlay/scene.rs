//! Drawing plan for the selection overlay.
//!
//! The dimmed area is a single path made of the surface bounds and the
//! selection, filled with the even-odd rule, so the selection shows as a
//! clean hole regardless of how the host rasterizes.

use extshot_types::{Point, Rect, Size};

/// RGBA colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
}

/// Fill for everything outside the selection.
pub const DIM_COLOR: Color = Color::rgba(0.0, 0.0, 0.0, 0.3);

pub const OUTLINE_WIDTH: f64 = 2.0;

pub const HINT_TEXT: &str = "Drag to move • Double-click to capture • Press ESC to exit";

/// Distance of the hint's baseline box from the top edge.
const HINT_TOP_MARGIN: f64 = 40.0;

/// Everything a host needs to render the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayScene {
    pub bounds: Rect,
    pub selection: Rect,
    pub dim: Color,
    pub outline: Color,
    pub outline_width: f64,
    pub hint: &'static str,
}

impl OverlayScene {
    pub fn new(surface: Size, selection: Rect) -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, surface.width, surface.height),
            selection,
            dim: DIM_COLOR,
            outline: Color::WHITE,
            outline_width: OUTLINE_WIDTH,
            hint: HINT_TEXT,
        }
    }

    /// Sub-paths of the dim fill, to be filled with the even-odd rule.
    pub fn dim_path(&self) -> [Rect; 2] {
        [self.bounds, self.selection]
    }

    /// Whether `point` is covered by the dim fill under the even-odd rule.
    pub fn is_dimmed(&self, point: Point) -> bool {
        let crossings = self
            .dim_path()
            .iter()
            .filter(|rect| rect.contains(point))
            .count();
        crossings % 2 == 1
    }

    /// Top-left corner for a hint of `text_size`, centred horizontally near
    /// the top edge.
    pub fn hint_origin(&self, text_size: Size) -> Point {
        Point::new(
            ((self.bounds.width() - text_size.width) / 2.0).max(0.0),
            HINT_TOP_MARGIN,
        )
    }
}
