//! Coordinate transforms from an overlay selection to device pixels.
//!
//! A selection starts in the overlay view's own space, is offset into its
//! window and then onto the global desktop, and is finally expressed in the
//! device pixels of one display. All functions are pure.
//!
//! The vertical flip happens in exactly one place,
//! [`flip_vertical_if_needed`], and [`selection_to_device_rect`] calls it
//! once. Callers must not flip again.

use crate::capture::CaptureError;
use extshot_types::{PixelRect, Point, Rect, ScreenTransformContext, Size};

/// Offset a view-local rectangle by the view's origin within its window.
pub fn view_to_window(rect: Rect, view_frame: Rect) -> Rect {
    rect.offset(view_frame.x(), view_frame.y())
}

/// Offset a window-local rectangle by the window's origin on the desktop.
pub fn window_to_screen(rect: Rect, window_origin: Point) -> Rect {
    rect.offset(window_origin.x, window_origin.y)
}

/// Mirror `rect` vertically within a space of height `screen_height` when the
/// rectangle is expressed with a bottom-left origin and the target expects a
/// top-left one. Identity otherwise.
pub fn flip_vertical_if_needed(
    rect: Rect,
    screen_height: f64,
    target_uses_bottom_left_origin: bool,
) -> Rect {
    if !target_uses_bottom_left_origin {
        return rect;
    }
    Rect::new(
        rect.x(),
        screen_height - rect.y() - rect.height(),
        rect.width(),
        rect.height(),
    )
}

/// Keep `rect` inside `[0, screen_size]`, moving its origin and, when it is
/// larger than the screen, shrinking it to fit.
pub fn clamp_to_screen_bounds(rect: Rect, screen_size: Size) -> Rect {
    let width = rect.width().clamp(0.0, screen_size.width.max(0.0));
    let height = rect.height().clamp(0.0, screen_size.height.max(0.0));
    let x = rect.x().clamp(0.0, (screen_size.width - width).max(0.0));
    let y = rect.y().clamp(0.0, (screen_size.height - height).max(0.0));
    Rect::new(x, y, width, height)
}

/// Convert a desktop rectangle to device pixels of the display in `context`.
///
/// Origin and extent are floored, never rounded up. Parts left of or above
/// the display are cut off.
pub fn screen_to_device_pixels(rect: Rect, context: &ScreenTransformContext) -> PixelRect {
    let scale = context.scale_factor;
    let local_x = rect.x() - context.origin.x;
    let local_y = rect.y() - context.origin.y;

    let x = (local_x * scale).floor().max(0.0);
    let y = (local_y * scale).floor().max(0.0);
    let right = ((local_x + rect.width()) * scale).max(0.0);
    let bottom = ((local_y + rect.height()) * scale).max(0.0);
    let width = (rect.width() * scale).floor().min((right - x).max(0.0).floor());
    let height = (rect.height() * scale).floor().min((bottom - y).max(0.0).floor());

    PixelRect::new(x as u32, y as u32, width.max(0.0) as u32, height.max(0.0) as u32)
}

/// Run a finalized selection through the whole chain: view, window, one
/// vertical flip, display bounds, device pixels.
///
/// `selection_uses_bottom_left_origin` describes the selection's space; the
/// device-pixel target always uses a top-left origin.
pub fn selection_to_device_rect(
    selection: Rect,
    view_frame: Rect,
    window_origin: Point,
    context: &ScreenTransformContext,
    selection_uses_bottom_left_origin: bool,
) -> Result<PixelRect, CaptureError> {
    if selection.is_empty() {
        return Err(CaptureError::InvalidRegion(format!(
            "{}x{} selection has no area",
            selection.width(),
            selection.height()
        )));
    }
    if !(context.scale_factor > 0.0) {
        return Err(CaptureError::InvalidRegion(format!(
            "invalid scale factor {}",
            context.scale_factor
        )));
    }

    let on_screen = window_to_screen(view_to_window(selection, view_frame), window_origin);

    let local = on_screen.offset(-context.origin.x, -context.origin.y);
    let local = flip_vertical_if_needed(local, context.size.height, selection_uses_bottom_left_origin);
    let local = clamp_to_screen_bounds(local, context.size);

    let device = screen_to_device_pixels(local.offset(context.origin.x, context.origin.y), context);
    if device.is_empty() {
        return Err(CaptureError::InvalidRegion(
            "selection does not cover any device pixels".to_string(),
        ));
    }
    Ok(device)
}
