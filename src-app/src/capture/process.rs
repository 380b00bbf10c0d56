//! Frame post-processing: crop to the selection, convert to RGBA and
//! resample Large captures to their exact preset size.

use super::error::CaptureError;
use super::types::{CapturedFrame, RawFrame};
use extshot_types::{PixelRect, PresetSize};
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Crop `frame` to `rect` and produce the final image for `preset`.
///
/// The crop is clamped to the frame. Large presets are resampled so the
/// output is exactly `preset.width × preset.height` pixels regardless of the
/// display's scale factor; other presets keep device resolution.
pub fn crop_and_scale(
    frame: &RawFrame,
    rect: PixelRect,
    preset: PresetSize,
) -> Result<CapturedFrame, CaptureError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() < expected {
        return Err(CaptureError::InvalidRegion(format!(
            "frame buffer too small: expected {} bytes, got {}",
            expected,
            frame.data.len()
        )));
    }

    let x = rect.x.min(frame.width);
    let y = rect.y.min(frame.height);
    let w = rect.width.min(frame.width - x);
    let h = rect.height.min(frame.height - y);
    if w == 0 || h == 0 {
        return Err(CaptureError::InvalidRegion(format!(
            "selection {}x{} at ({}, {}) lies outside the {}x{} frame",
            rect.width, rect.height, rect.x, rect.y, frame.width, frame.height
        )));
    }

    let src_stride = frame.width as usize * 4;
    let row_bytes = w as usize * 4;
    let mut rgba = Vec::with_capacity(row_bytes * h as usize);
    for row in 0..h as usize {
        let start = (y as usize + row) * src_stride + x as usize * 4;
        for px in frame.data[start..start + row_bytes].chunks_exact(4) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    }

    let cropped = RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| CaptureError::InvalidRegion("failed to create image buffer".to_string()))?;

    let image = if preset.is_large() && (w, h) != (preset.width, preset.height) {
        imageops::resize(&cropped, preset.width, preset.height, FilterType::Lanczos3)
    } else {
        cropped
    };

    Ok(CapturedFrame { image, preset })
}
