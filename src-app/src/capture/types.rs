//! Frame and stream types shared by capture backends and the session.

use extshot_types::PresetSize;
use image::RgbaImage;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A frame as delivered by a capture stream.
#[derive(Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// BGRA pixel data, tightly packed (`width * 4` bytes per row)
    pub data: Vec<u8>,
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Receiver for frames from a capture stream.
pub type FrameReceiver = mpsc::Receiver<RawFrame>;

/// Stops an open capture stream.
///
/// `stop` consumes the handle, so a stream can be stopped at most once.
pub struct StopHandle(Box<dyn FnOnce() + Send>);

impl StopHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(stop))
    }

    /// Handle that raises `flag`; the stream's keep-alive thread watches it.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self::new(move || flag.store(true, Ordering::SeqCst))
    }

    pub fn stop(self) {
        (self.0)()
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopHandle")
    }
}

/// The final image of a capture: RGBA pixels cropped (and possibly
/// resampled) to the selection.
///
/// Owned by the session until it is moved to the persister.
#[derive(Debug)]
pub struct CapturedFrame {
    pub image: RgbaImage,
    /// Preset the selection was made with; names the output file
    pub preset: PresetSize,
}

impl CapturedFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
