//! In-memory capture backend for tests.

use super::error::{CaptureError, EnumerationError};
use super::types::{FrameReceiver, RawFrame, StopHandle};
use super::CaptureBackend;
use extshot_types::DisplayInfo;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What a fake stream does once opened.
#[derive(Debug, Clone, Copy)]
pub enum FrameScript {
    /// Deliver this many frames, then stay open
    Frames(usize),
    /// Stay open without delivering anything
    Silent,
    /// Close without delivering anything
    Closed,
    /// Stay open, then fail after this long without delivering anything,
    /// the way a platform stream reports an error
    FailsAfter(Duration),
    /// Refuse to open
    OpenFails,
}

/// 640x400 points at scale 2.
pub fn test_display() -> DisplayInfo {
    DisplayInfo {
        id: 1,
        name: "Test Display".to_string(),
        x: 0.0,
        y: 0.0,
        width: 640.0,
        height: 400.0,
        scale_factor: 2.0,
        is_primary: true,
    }
}

/// Frame whose pixel at (x, y) is BGRA `(x % 256, y % 256, x / 256, 0xFF)`.
pub fn coded_frame(width: u32, height: u32) -> RawFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, (x / 256) as u8, 0xFF]);
        }
    }
    RawFrame {
        width,
        height,
        data,
    }
}

pub struct FakeBackend {
    displays: Vec<DisplayInfo>,
    permission: bool,
    script: Mutex<FrameScript>,
    opens: AtomicUsize,
    stops: Arc<AtomicUsize>,
    open_senders: Mutex<Vec<mpsc::Sender<RawFrame>>>,
}

impl FakeBackend {
    pub fn new(script: FrameScript) -> Self {
        Self {
            displays: vec![test_display()],
            permission: true,
            script: Mutex::new(script),
            opens: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
            open_senders: Mutex::new(Vec::new()),
        }
    }

    pub fn with_displays(mut self, displays: Vec<DisplayInfo>) -> Self {
        self.displays = displays;
        self
    }

    pub fn without_permission(mut self) -> Self {
        self.permission = false;
        self
    }

    pub fn set_script(&self, script: FrameScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for FakeBackend {
    fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError> {
        Ok(self.displays.clone())
    }

    fn has_permission(&self) -> bool {
        self.permission
    }

    fn request_permission(&self) {}

    fn start_display_capture(
        &self,
        display: &DisplayInfo,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError> {
        let script = *self.script.lock().unwrap();
        if let FrameScript::OpenFails = script {
            return Err(CaptureError::StreamOpenFailed("fake refused".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        let count = match script {
            FrameScript::Frames(n) => n,
            _ => 0,
        };
        let (tx, rx) = mpsc::channel(count.max(1));
        if count > 0 {
            let frame = coded_frame(display.pixel_width(), display.pixel_height());
            for _ in 0..count {
                tx.try_send(frame.clone()).unwrap();
            }
        }
        match script {
            FrameScript::Closed => drop(tx),
            FrameScript::FailsAfter(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    drop(tx);
                });
            }
            _ => self.open_senders.lock().unwrap().push(tx),
        }

        let stops = self.stops.clone();
        let stop = StopHandle::new(move || {
            stops.fetch_add(1, Ordering::SeqCst);
        });
        Ok((rx, stop))
    }
}
