//! Shared types for ExtShot.
//!
//! This crate holds the platform-neutral data model used by the capture
//! pipeline and the command-line front end: geometry in logical points and
//! device pixels, the preset size catalogue, display descriptions and the
//! immutable capture request handed from the overlay to the capture session.

pub mod display;
pub mod geometry;
pub mod logging;
pub mod preset;
pub mod request;

pub use display::{DisplayInfo, ScreenTransformContext};
pub use geometry::{PixelRect, Point, Rect, Size};
pub use preset::{ParsePresetError, PresetSize};
pub use request::CaptureRequest;
