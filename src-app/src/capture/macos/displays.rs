//! Display enumeration using Core Graphics.

use crate::capture::error::EnumerationError;
use core_graphics::display::{CGDirectDisplayID, CGDisplay, CGGetActiveDisplayList, CGMainDisplayID};
use extshot_types::DisplayInfo;
use tracing::warn;

const MAX_DISPLAYS: u32 = 32;

/// List active displays, primary first.
///
/// Positions and sizes are Core Graphics bounds: logical points in the
/// global desktop space with a top-left origin.
pub fn list_displays() -> Result<Vec<DisplayInfo>, EnumerationError> {
    let main_display_id = unsafe { CGMainDisplayID() };

    let mut display_ids: Vec<CGDirectDisplayID> = vec![0; MAX_DISPLAYS as usize];
    let mut display_count: u32 = 0;
    let result = unsafe {
        CGGetActiveDisplayList(MAX_DISPLAYS, display_ids.as_mut_ptr(), &mut display_count)
    };
    if result != 0 {
        warn!("CGGetActiveDisplayList failed with error {}", result);
        return Err(EnumerationError::PlatformError(format!(
            "CGGetActiveDisplayList returned {}",
            result
        )));
    }
    display_ids.truncate(display_count as usize);

    let mut displays: Vec<DisplayInfo> = display_ids
        .into_iter()
        .map(|display_id| {
            let display = CGDisplay::new(display_id);
            let bounds = display.bounds();
            let is_primary = display_id == main_display_id;

            // Core Graphics has no display names; describe by id.
            let name = if is_primary {
                format!("Display {} (Primary)", display_id)
            } else {
                format!("Display {}", display_id)
            };

            // Physical pixels per logical point, 2.0 on Retina panels
            let scale_factor = if bounds.size.width > 0.0 {
                display.pixels_wide() as f64 / bounds.size.width
            } else {
                1.0
            };

            DisplayInfo {
                id: display_id,
                name,
                x: bounds.origin.x,
                y: bounds.origin.y,
                width: bounds.size.width,
                height: bounds.size.height,
                scale_factor,
                is_primary,
            }
        })
        .collect();

    displays.sort_by(|a, b| b.is_primary.cmp(&a.is_primary));
    Ok(displays)
}
