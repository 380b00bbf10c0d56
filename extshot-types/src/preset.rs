//! Preset capture sizes.

use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed selection size in logical points.
///
/// The selection overlay only lets the user move a rectangle of this size,
/// never resize it. Serialized as `"<width>x<height>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PresetSize {
    pub width: u32,
    pub height: u32,
}

impl PresetSize {
    /// 1280×800, captured at exactly this many output pixels.
    pub const LARGE: PresetSize = PresetSize::new(1280, 800);
    /// 640×400, captured at the display's native resolution.
    pub const SMALL: PresetSize = PresetSize::new(640, 400);

    /// Built-in presets, in menu order.
    pub const CATALOGUE: [PresetSize; 2] = [Self::LARGE, Self::SMALL];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Name of a built-in preset, if this is one.
    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::LARGE => Some("large"),
            Self::SMALL => Some("small"),
            _ => None,
        }
    }

    /// Whether captures of this preset are resampled to exactly
    /// `width × height` output pixels instead of keeping device resolution.
    pub fn is_large(&self) -> bool {
        *self == Self::LARGE
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

impl fmt::Display for PresetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Error returned when a preset string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePresetError(String);

impl fmt::Display for ParsePresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid preset '{}': expected 'large', 'small' or '<width>x<height>'",
            self.0
        )
    }
}

impl std::error::Error for ParsePresetError {}

impl FromStr for PresetSize {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "large" => return Ok(Self::LARGE),
            "small" => return Ok(Self::SMALL),
            _ => {}
        }

        let (w, h) = trimmed
            .split_once('x')
            .ok_or_else(|| ParsePresetError(s.to_string()))?;
        let width: u32 = w.trim().parse().map_err(|_| ParsePresetError(s.to_string()))?;
        let height: u32 = h.trim().parse().map_err(|_| ParsePresetError(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ParsePresetError(s.to_string()));
        }
        Ok(Self::new(width, height))
    }
}

impl TryFrom<String> for PresetSize {
    type Error = ParsePresetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PresetSize> for String {
    fn from(preset: PresetSize) -> Self {
        preset.to_string()
    }
}
